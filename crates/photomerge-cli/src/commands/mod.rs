pub mod avg;
pub mod config;
pub mod dro;
pub mod hdr;
pub mod histogram;

use clap::ValueEnum;
use photomerge_core::pipeline::config::{ContrastEnhancement, DroAlgorithm, TonemapAlgorithm};

#[derive(Clone, Copy, ValueEnum)]
pub enum TonemapArg {
    Clamp,
    Exponential,
    Reinhard,
    Filmic,
    Aces,
}

impl From<TonemapArg> for TonemapAlgorithm {
    fn from(arg: TonemapArg) -> Self {
        match arg {
            TonemapArg::Clamp => TonemapAlgorithm::Clamp,
            TonemapArg::Exponential => TonemapAlgorithm::Exponential,
            TonemapArg::Reinhard => TonemapAlgorithm::Reinhard,
            TonemapArg::Filmic => TonemapAlgorithm::Filmic,
            TonemapArg::Aces => TonemapAlgorithm::Aces,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ContrastArg {
    Off,
    Smart,
    Always,
}

impl From<ContrastArg> for ContrastEnhancement {
    fn from(arg: ContrastArg) -> Self {
        match arg {
            ContrastArg::Off => ContrastEnhancement::Off,
            ContrastArg::Smart => ContrastEnhancement::Smart,
            ContrastArg::Always => ContrastEnhancement::Always,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DroArg {
    None,
    GainGamma,
}

impl From<DroArg> for DroAlgorithm {
    fn from(arg: DroArg) -> Self {
        match arg {
            DroArg::None => DroAlgorithm::None,
            DroArg::GainGamma => DroAlgorithm::GainGamma,
        }
    }
}
