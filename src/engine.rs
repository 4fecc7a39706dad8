//! Batch reconciliation over tabular input files.
//!
//! Each public operation is one full pass over an input row sequence. Rows
//! are processed strictly in order, one remote call at a time; a row that
//! fails is recorded in the [`FailureLedger`] and never aborts the rest of
//! the batch. Only pre-loop conditions (a missing required input file, a
//! failed menu fetch) are fatal. Nothing is rolled back: every batch has
//! partial-success semantics.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, info, instrument, warn};

use crate::catalog::{CatalogApi, StockRequest};
use crate::error::{Result, SyncError};
use crate::io::{csv_read, csv_write};
use crate::ledger::FailureLedger;
use crate::mapper::{
    AvailabilityPolicy, FollowUp, build_add_request, build_reprice_request, build_update_request,
    derive_availability, follow_up_for_quantity, parse_amount, parse_status, resolve_delete_id,
};
use crate::model::{PosRow, ProductRow, STATUS_OUT_OF_STOCK};

/// Locations of every file one run touches, resolved against a single
/// working directory so batches and their failure outputs stay together.
#[derive(Debug, Clone)]
pub struct BatchFiles {
    dir: PathBuf,
}

impl BatchFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Export output, doubling as the update and reprice product input.
    pub fn products(&self) -> PathBuf {
        self.dir.join("list-product.csv")
    }

    pub fn update_failures(&self) -> PathBuf {
        self.dir.join("list-product-failed-update.csv")
    }

    /// Input of the add batch.
    pub fn upload(&self) -> PathBuf {
        self.dir.join("list-upload-new.csv")
    }

    /// Template written when the add input is missing.
    pub fn upload_sample(&self) -> PathBuf {
        self.dir.join("sample-list-upload-new.csv")
    }

    pub fn add_failures(&self) -> PathBuf {
        self.dir.join("list-upload-new-failed-add.csv")
    }

    /// Point-of-sale export consumed by the reprice batch.
    pub fn pos_export(&self) -> PathBuf {
        self.dir.join("pos-export.csv")
    }

    pub fn reprice_failures(&self) -> PathBuf {
        self.dir.join("pos-reprice-failed.csv")
    }

    /// Input of the delete batch.
    pub fn delete_list(&self) -> PathBuf {
        self.dir.join("delete-product.csv")
    }

    pub fn delete_failures(&self) -> PathBuf {
        self.dir.join("delete-product-failed.csv")
    }
}

/// Outcome of one batch operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Rows read from the input, including ones that later failed.
    pub attempted: usize,
    /// Rows whose remote mutations all succeeded.
    pub succeeded: usize,
    /// Rows recorded in the failure ledger.
    pub failed: usize,
    /// Rows skipped without any remote call (delete rows with no
    /// resolvable identifier).
    pub skipped: usize,
    /// Failure file written at batch end, absent when nothing failed.
    pub failure_file: Option<PathBuf>,
}

/// Orchestrates the five batch operations against a catalog client.
pub struct Engine<'a, C> {
    client: &'a C,
    files: BatchFiles,
    policy: AvailabilityPolicy,
}

impl<'a, C: CatalogApi> Engine<'a, C> {
    pub fn new(client: &'a C, files: BatchFiles) -> Self {
        Self {
            client,
            files,
            policy: AvailabilityPolicy::default(),
        }
    }

    /// Overrides the update batch's availability policy.
    pub fn with_policy(mut self, policy: AvailabilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetches the full remote menu, flattens category/item pairs into
    /// product rows, and writes the export file. A fetch failure is fatal
    /// and produces no partial output.
    #[instrument(level = "info", skip_all)]
    pub fn export(&self) -> Result<usize> {
        let categories = self.client.fetch_menu()?;
        let rows: Vec<ProductRow> = categories
            .iter()
            .flat_map(|category| {
                category
                    .items
                    .iter()
                    .map(move |item| ProductRow::from_menu_item(category, item))
            })
            .collect();

        let output = self.files.products();
        csv_write::write_products(&output, &rows)?;
        info!(rows = rows.len(), file = %output.display(), "menu exported");
        Ok(rows.len())
    }

    /// Re-applies the (possibly operator-edited) export file: upsert each
    /// row, then set its availability per the configured policy.
    #[instrument(level = "info", skip_all)]
    pub fn update(&self) -> Result<BatchSummary> {
        let rows = csv_read::read_rows(&self.files.products())?;
        let mut ledger = FailureLedger::new(rows.headers.clone());
        let mut summary = BatchSummary {
            attempted: rows.records.len(),
            ..BatchSummary::default()
        };

        for record in &rows.records {
            let row: ProductRow = match rows.typed(record) {
                Ok(row) => row,
                Err(error) => {
                    ledger.record(record.clone(), error.to_string());
                    continue;
                }
            };
            match self.update_row(&row) {
                Ok(()) => {
                    info!(item = %row.item_name, "updated");
                    summary.succeeded += 1;
                }
                Err(error) => {
                    warn!(item = %row.item_name, %error, "update failed");
                    ledger.record(record.clone(), error.to_string());
                }
            }
        }

        self.finish(summary, ledger, self.files.update_failures())
    }

    fn update_row(&self, row: &ProductRow) -> Result<()> {
        let request = build_update_request(row);
        self.client.upsert_item(&request)?;

        let status = derive_availability(
            self.policy,
            parse_amount(&row.stock),
            parse_status(&row.available_status),
        )
        .ok_or(SyncError::MissingStatus)?;
        self.client
            .set_availability(&[row.item_id.clone()], status)?;
        Ok(())
    }

    /// Creates new items from the upload file. When the upload file is
    /// absent this is not an error: a sample file is written instead so the
    /// operator knows the expected columns.
    #[instrument(level = "info", skip_all)]
    pub fn add(&self) -> Result<BatchSummary> {
        let upload = self.files.upload();
        if !upload.exists() {
            let sample = self.files.upload_sample();
            if !sample.exists() {
                csv_write::write_sample_upload(&sample)?;
                info!(file = %sample.display(), "sample upload file written");
            }
            info!(file = %upload.display(), "upload file missing, nothing to add");
            return Ok(BatchSummary::default());
        }

        let rows = csv_read::read_rows(&upload)?;
        let mut ledger = FailureLedger::new(rows.headers.clone());
        let mut summary = BatchSummary {
            attempted: rows.records.len(),
            ..BatchSummary::default()
        };

        for record in &rows.records {
            let row: ProductRow = match rows.typed(record) {
                Ok(row) => row,
                Err(error) => {
                    ledger.record(record.clone(), error.to_string());
                    continue;
                }
            };
            match self.add_row(&row) {
                Ok(()) => {
                    info!(item = %row.item_name, "added");
                    summary.succeeded += 1;
                }
                Err(error) => {
                    warn!(item = %row.item_name, %error, "add failed");
                    ledger.record(record.clone(), error.to_string());
                }
            }
        }

        self.finish(summary, ledger, self.files.add_failures())
    }

    fn add_row(&self, row: &ProductRow) -> Result<()> {
        let request = build_add_request(row);
        let outcome = self.client.upsert_item(&request)?;
        // The item may now exist remotely; without its identifier the
        // stock cannot be attached, and no rollback is attempted.
        let item_id = outcome
            .item_id
            .filter(|id| !id.is_empty())
            .ok_or(SyncError::MissingItemId)?;
        self.apply_follow_up(&item_id, parse_amount(&row.stock))
    }

    /// Reprices known items from a point-of-sale export. Both the current
    /// product export and the POS file are required; a missing one aborts
    /// before any remote call. `percent` is the markup applied on top of
    /// the POS normal price.
    #[instrument(level = "info", skip_all, fields(percent = percent))]
    pub fn reprice(&self, percent: i64) -> Result<BatchSummary> {
        let products = csv_read::read_rows(&self.files.products())?;
        let pos_rows = csv_read::read_rows(&self.files.pos_export())?;

        let mut by_sku: HashMap<String, ProductRow> = HashMap::new();
        for record in &products.records {
            if let Ok(row) = products.typed::<ProductRow>(record) {
                if !row.sku_id.trim().is_empty() {
                    by_sku.insert(row.sku_id.trim().to_string(), row);
                }
            }
        }
        debug!(known_skus = by_sku.len(), "product index built");

        let mut ledger = FailureLedger::new(pos_rows.headers.clone());
        let mut summary = BatchSummary {
            attempted: pos_rows.records.len(),
            ..BatchSummary::default()
        };

        for record in &pos_rows.records {
            let row: PosRow = match pos_rows.typed(record) {
                Ok(row) => row,
                Err(error) => {
                    ledger.record(record.clone(), error.to_string());
                    continue;
                }
            };
            let Some(product) = by_sku.get(row.item_code.trim()) else {
                warn!(sku = %row.item_code, "SKU not found in product export");
                ledger.record(
                    record.clone(),
                    format!("SKU not found in product export: {}", row.item_code.trim()),
                );
                continue;
            };
            match self.reprice_row(&row, product, percent) {
                Ok(()) => {
                    info!(item = %product.item_name, "repriced");
                    summary.succeeded += 1;
                }
                Err(error) => {
                    warn!(item = %product.item_name, %error, "reprice failed");
                    ledger.record(record.clone(), error.to_string());
                }
            }
        }

        self.finish(summary, ledger, self.files.reprice_failures())
    }

    fn reprice_row(&self, pos: &PosRow, product: &ProductRow, percent: i64) -> Result<()> {
        let (request, quantity) = build_reprice_request(pos, product, percent);
        let outcome = self.client.upsert_item(&request)?;
        let item_id = outcome
            .item_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| product.item_id.clone());
        if item_id.is_empty() {
            return Err(SyncError::MissingItemId);
        }
        self.apply_follow_up(&item_id, quantity)
    }

    /// Deletes the items listed in the delete file. A row that names no
    /// identifier under any accepted column is skipped silently rather
    /// than recorded as a failure.
    #[instrument(level = "info", skip_all)]
    pub fn delete(&self) -> Result<BatchSummary> {
        let rows = csv_read::read_rows(&self.files.delete_list())?;
        let mut ledger = FailureLedger::new(rows.headers.clone());
        let mut summary = BatchSummary {
            attempted: rows.records.len(),
            ..BatchSummary::default()
        };

        for record in &rows.records {
            let Some(item_id) = resolve_delete_id(&rows.headers, record) else {
                debug!("row without an item identifier skipped");
                summary.skipped += 1;
                continue;
            };
            match self.client.delete_item(&item_id) {
                Ok(()) => {
                    info!(item_id = %item_id, "deleted");
                    summary.succeeded += 1;
                }
                Err(error) => {
                    warn!(item_id = %item_id, %error, "delete failed");
                    ledger.record(record.clone(), error.to_string());
                }
            }
        }

        self.finish(summary, ledger, self.files.delete_failures())
    }

    /// After a successful upsert exactly one follow-up call is issued:
    /// stock when the resolved quantity is positive, otherwise the forced
    /// out-of-stock status.
    fn apply_follow_up(&self, item_id: &str, quantity: Option<i64>) -> Result<()> {
        match follow_up_for_quantity(quantity) {
            FollowUp::Stock(current_stock) => self.client.set_stock(
                item_id,
                &StockRequest {
                    enable_inventory_management: true,
                    current_stock,
                },
            ),
            FollowUp::ForceUnavailable => self
                .client
                .set_availability(&[item_id.to_string()], STATUS_OUT_OF_STOCK),
        }
    }

    fn finish(
        &self,
        mut summary: BatchSummary,
        ledger: FailureLedger,
        failure_path: PathBuf,
    ) -> Result<BatchSummary> {
        summary.failed = ledger.len();
        summary.failure_file = ledger.flush_if_nonempty(&failure_path)?;
        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "batch finished"
        );
        Ok(summary)
    }
}
