//! List command implementation.

use crate::cmd::{Context, print_header};
use anyhow::{Result, bail};
use ronda_data::{MetricCatalog, MetricCategory};
use ronda_screen::{DetectorRegistry, SegmentationRegistry};

/// List registered segmentations, detectors and metrics.
pub(crate) fn run_list(ctx: &Context, kind: Option<&str>, verbose: bool) -> Result<()> {
    let kind = kind.map(str::to_lowercase);
    let show = |name: &str| kind.as_deref().is_none_or(|k| name.starts_with(k));
    if let Some(k) = kind.as_deref()
        && !["segmentations", "detectors", "metrics"].iter().any(|n| n.starts_with(k))
    {
        bail!("Unknown kind '{k}'. Use segmentations, detectors or metrics.");
    }

    print_header("Ronda Registries");

    if show("segmentations") {
        println!("Segmentations:");
        println!("{}", "-".repeat(60));
        for info in SegmentationRegistry::with_defaults().infos() {
            print_entry(&info.name, &info.description, verbose);
        }
        println!();
    }

    if show("detectors") {
        println!("Detectors:");
        println!("{}", "-".repeat(60));
        let registry = DetectorRegistry::with_defaults(&ctx.config.screening.detectors);
        for info in registry.infos() {
            print_entry(&info.name, &info.description, verbose);
        }
        println!();
    }

    if show("metrics") {
        let catalog = MetricCatalog::with_defaults();
        for category in MetricCategory::ALL {
            let metrics = catalog.by_category(category);
            if metrics.is_empty() {
                continue;
            }
            println!("{category:?} metrics:");
            println!("{}", "-".repeat(60));
            for def in metrics {
                if verbose {
                    println!("  {:22} - {} ({:?})", def.name, def.description, def.polarity);
                } else {
                    println!("  {}", def.name);
                }
            }
            println!();
        }
    }

    if !verbose {
        println!("Use --verbose for descriptions.\n");
    }
    Ok(())
}

fn print_entry(name: &str, description: &str, verbose: bool) {
    if verbose {
        println!("  {name:22} - {description}");
    } else {
        println!("  {name}");
    }
}
