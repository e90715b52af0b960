/*!
# SheetScope

A small web service that ingests a spreadsheet upload and derives views from it.

## Overview

A CSV or Excel file is uploaded, validated against an extension allow-list,
saved to the upload directory and parsed into an in-memory [`Table`]. From the
current table the service derives:

- a [`SummaryRecord`] (file name, row and column counts, column names, upload time)
- per-column descriptive statistics for numeric columns (mean, std, min, max)
- a preview of the first rows and a box-plot chart
- case-insensitive substring search across every column
- CSV and XLSX exports
- a node/link graph document (one node per row) persisted as JSON, with
  backup-on-clear

## Architecture

### Data Layer
- **cell**: the typed cell value and text inference
- **table**: columns in stable order plus rows of cells
- **loader**: CSV (csv crate) and Excel (calamine) decoding
- **store**: the current dataset, swapped atomically on every upload

### Derived Views
- **stats**: summary record, statistics and preview
- **search**: linear substring search over stringified cells
- **downloader**: CSV and XLSX export
- **graph**: graph document building, persistence, search and stats
- **chart**: box-plot rendering with plotters (best-effort)

### Web Layer
- **upload**: filename validation and sanitization, saving to disk
- **pages**: handlebars HTML pages
- **app**: axum routing, handlers and middleware
- **config**: environment configuration

## REST API Endpoints

- `POST /upload`, `POST /api/upload` - Ingest a spreadsheet
- `GET /analysis`, `GET /search?q=` - HTML views of the current data
- `GET /api/data`, `GET /api/summary` - Current data as JSON
- `GET /download?format=csv|xlsx` - Export the current data
- `GET /api/graph`, `POST /api/search` - Graph document and node search
- `POST /api/data/clear`, `GET /api/data/stats` - Graph maintenance
- `GET /health`, `GET /api/health` - Liveness probe
*/

pub mod cell;
pub mod config;
pub mod downloader;
pub mod error;
pub mod graph;
pub mod loader;
pub mod search;
pub mod stats;
pub mod store;
pub mod table;
pub mod upload;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod chart;
#[cfg(feature = "web")]
pub mod pages;

/// Re-export the main types to make them easier to use
pub use cell::Value;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use graph::{GraphDocument, GraphNode, GraphStore};
pub use stats::{ColumnStats, SummaryRecord};
pub use store::{DataStore, Dataset};
pub use table::Table;
