use pretty_env_logger;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn _setup_pretty_env_logger_default() {
    INIT.call_once(|| {
        pretty_env_logger::init();
    });
}

pub use labeled::{Dataset, Labeled, LabeledField};
pub use xspharm::{Xspharm, XspharmBuilder, XspharmError};
pub mod adapter;
pub mod engine;
pub mod grid;
pub mod io;
pub mod labeled;
pub mod plot;
pub mod xspharm;
