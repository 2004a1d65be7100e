use clap::Args;
use toml::{Table, Value};

use crate::util::prelude::*;

#[derive(Args, Debug)]
pub struct ConfigArgs {
	/// Section to print, dotted for nested sections (e.g. `projects.alpha`)
	pub section: String,
}

pub async fn run(ctx: &Context, args: ConfigArgs) -> Result<()> {
	let section = ctx.store.redacted_section(&args.section)?;

	print_output!(ctx, &section, |section: &Table| {
		let mut table = comfy_table::Table::new();
		table.load_preset(UTF8_BORDERS_ONLY);
		table.set_header(vec!["Option", "Value"]);

		for (option, value) in section {
			table.add_row(vec![option.clone(), render(value)]);
		}

		println!("[{}]", args.section);
		println!("{table}");
		println!();
		println!("Config file: {}", ctx.config_path.display());
	});

	Ok(())
}

fn render(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Table(_) => "(section)".to_string(),
		other => other.to_string(),
	}
}
