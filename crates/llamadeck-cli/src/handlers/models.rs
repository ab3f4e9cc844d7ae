//! Models command handler.

use anyhow::Result;
use llamadeck_core::ModelInfo;

use crate::bootstrap::CliContext;
use crate::presentation::{print_separator, truncate_string};

/// List model files, optionally with their descriptions.
pub fn execute(ctx: &CliContext, describe: bool, json: bool) -> Result<()> {
    let session = &ctx.session;

    if describe {
        let models = session.describe_models();
        if json {
            println!("{}", serde_json::to_string_pretty(&models)?);
        } else {
            print_table(ctx, &models);
        }
        return Ok(());
    }

    let paths = session.list_models();
    if json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
    } else if paths.is_empty() {
        print_empty(ctx);
    } else {
        for path in paths {
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn print_empty(ctx: &CliContext) {
    println!(
        "No models found in {}",
        ctx.session.config().models_dir.display()
    );
}

fn print_table(ctx: &CliContext, models: &[ModelInfo]) {
    if models.is_empty() {
        print_empty(ctx);
        return;
    }

    println!(
        "{:<40} {:<10} {:<8} {:<8} Modified",
        "Name", "Size", "Quant", "Format"
    );
    print_separator(90);
    for model in models {
        println!(
            "{:<40} {:<10} {:<8} {:<8} {}",
            truncate_string(&model.name, 39),
            model.size_formatted,
            model.quantization,
            model.model_type,
            model.modified.format("%Y-%m-%d %H:%M:%S")
        );
    }
}
