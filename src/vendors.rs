use std::io::Write;

use anyhow::Result;

use crate::ingest::Vendor;

pub fn list_vendors(out: &mut impl Write) -> Result<()> {
    writeln!(out, "{:<14} {:<14} INPUT", "VENDOR", "NAME")?;
    for vendor in Vendor::ALL {
        let id = clap::ValueEnum::to_possible_value(&vendor)
            .map(|v| v.get_name().to_string())
            .unwrap_or_default();
        writeln!(
            out,
            "{:<14} {:<14} {}",
            id,
            vendor.display_name(),
            vendor.accepted_input()
        )?;
    }
    Ok(())
}
