use std::path::Path;

use console::Style;
use photomerge_core::frame::Offset;
use photomerge_core::histogram::{Histogram, HistogramSummary};
use photomerge_core::pipeline::config::MergeConfig;
use photomerge_core::pipeline::MergeOutput;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();
}

#[derive(Clone, Copy)]
pub enum MergeMode {
    Hdr,
    Avg,
    Dro,
}

impl MergeMode {
    fn title(self) -> &'static str {
        match self {
            Self::Hdr => "photomerge HDR",
            Self::Avg => "photomerge Avg",
            Self::Dro => "photomerge DRO",
        }
    }
}

/// Settings a merge is about to run with.
pub fn print_merge_settings(mode: MergeMode, inputs: usize, config: &MergeConfig) {
    let s = Styles::new();
    print_title(&s, mode.title());

    println!(
        "  {:<14}{}",
        s.label.apply_to("Inputs"),
        s.value.apply_to(inputs)
    );
    match mode {
        MergeMode::Hdr => {
            println!(
                "  {:<14}{}",
                s.label.apply_to("Tonemap"),
                s.method.apply_to(config.tonemap_algorithm)
            );
            println!(
                "  {:<14}{}",
                s.label.apply_to("Contrast"),
                s.method.apply_to(config.contrast_enhancement)
            );
            println!(
                "  {:<14}{}",
                s.label.apply_to("Alignment"),
                s.method.apply_to(config.hdr.alignment.metric)
            );
        }
        MergeMode::Avg => {
            println!(
                "  {:<14}{}",
                s.label.apply_to("Alignment"),
                s.method.apply_to(config.avg.alignment.metric)
            );
            match config.avg.wiener_c {
                Some(c) => println!(
                    "  {:<14}{}",
                    s.label.apply_to("Wiener C"),
                    s.value.apply_to(c)
                ),
                None => println!(
                    "  {:<14}{}",
                    s.label.apply_to("Wiener C"),
                    s.disabled.apply_to("from ISO")
                ),
            }
        }
        MergeMode::Dro => {
            println!(
                "  {:<14}{}",
                s.label.apply_to("DRO"),
                s.method.apply_to(config.dro_algorithm)
            );
            println!(
                "  {:<14}{}",
                s.label.apply_to("Alpha"),
                s.value.apply_to(config.always_alpha)
            );
        }
    }
    println!();
}

/// Result of a merge: where it went, per-frame offsets and the output
/// histogram.
pub fn print_merge_result(output: &MergeOutput, path: &Path) {
    let s = Styles::new();

    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(path.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Size"),
        s.value.apply_to(format!("{}x{}", output.frame.width(), output.frame.height()))
    );
    println!();

    print_offsets(&s, &output.offsets);
    print_histogram_section(&s, &output.histogram, output.summary.as_ref());
}

/// Histogram statistics of a single image.
pub fn print_histogram(path: &Path, histogram: &Histogram, proxy: &str) {
    let s = Styles::new();
    print_title(&s, "Histogram");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(path.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Proxy"),
        s.method.apply_to(proxy)
    );
    println!();

    print_histogram_section(&s, histogram, histogram.summarize().as_ref());
}

fn print_offsets(s: &Styles, offsets: &[Offset]) {
    println!("  {}", s.header.apply_to("Offsets"));
    for (i, offset) in offsets.iter().enumerate() {
        let style = if *offset == Offset::ZERO {
            &s.label
        } else {
            &s.value
        };
        println!(
            "    {:<12}{}",
            s.label.apply_to(format!("Frame {i}")),
            style.apply_to(offset)
        );
    }
    println!();
}

fn print_histogram_section(s: &Styles, histogram: &Histogram, summary: Option<&HistogramSummary>) {
    println!("  {}", s.header.apply_to("Histogram"));
    let Some(summary) = summary else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Pixels"),
            s.disabled.apply_to("none")
        );
        println!();
        return;
    };
    println!(
        "    {:<12}{}",
        s.label.apply_to("Pixels"),
        s.value.apply_to(histogram.total())
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Min"),
        s.value.apply_to(summary.min_nonzero_bin)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Median"),
        s.value.apply_to(summary.median_bin)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Max"),
        s.value.apply_to(summary.max_nonzero_bin)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Mean"),
        s.value.apply_to(format!("{:.1}", histogram.mean()))
    );
    println!();
}
