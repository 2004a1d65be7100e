pub use crate::context::{Context, OutputFormat};
pub use crate::print_output;
pub use anyhow::{anyhow, Context as _, Result};
pub use comfy_table::{presets::UTF8_BORDERS_ONLY, Table};
