//! # Powder Ingest
//!
//! Imports shot-velocity data exported by chronographs and normalizes it
//! into [`ParsedSeries`](powder_core::ParsedSeries) records.
//!
//! The format decoders live in `powder-core` and never touch the
//! filesystem. This crate adds everything around them: opening files,
//! unpacking ShotMarker bundles, reading Garmin workbooks, scanning
//! LabRadar device folders, configuration and output.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  path + vendor│──▶│   ingest     │──▶│ powder-core  │
//! │  (CLI / API)  │   │  dispatch    │   │  decoders    │
//! └──────────────┘   └──────┬───────┘   └──────┬───────┘
//!                           │                  │
//!              archive / workbook /            ▼
//!              labradar_dir            Vec<ParsedSeries> ──▶ output
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! powder extract labradar /media/LBR
//! powder extract shotmarker ~/backup.tar --format json
//! powder manual velocities.txt --units mps
//! powder vendors
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`ingest`] | Vendor selection and dispatch |
//! | [`archive`] | ShotMarker tar + zlib bundles |
//! | [`workbook`] | xlsx loading for Garmin workbooks |
//! | [`labradar_dir`] | LabRadar device directory scan |
//! | [`output`] | Human and JSON rendering |
//! | [`vendors`] | Vendor listing |

pub mod archive;
pub mod config;
pub mod ingest;
pub mod labradar_dir;
pub mod output;
pub mod vendors;
pub mod workbook;
