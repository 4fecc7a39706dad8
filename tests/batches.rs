use std::cell::RefCell;
use std::fs;
use std::path::Path;

use mexsync::SyncError;
use mexsync::catalog::{CatalogApi, ItemUpsertRequest, StockRequest, UpsertOutcome};
use mexsync::engine::{BatchFiles, Engine};
use mexsync::mapper::AvailabilityPolicy;
use mexsync::model::{MenuCategory, MenuItem, STATUS_OUT_OF_STOCK, Session, Weight};
use mexsync::session::SessionStore;
use tempfile::tempdir;

/// One remote call as seen by the scripted catalog below.
#[derive(Debug, Clone, PartialEq)]
enum Call {
    Upsert {
        item_name: String,
        item_id: Option<String>,
        price: Option<i64>,
    },
    SetStock {
        item_id: String,
        stock: i64,
    },
    SetAvailability {
        item_ids: Vec<String>,
        status: i32,
    },
    Delete {
        item_id: String,
    },
}

/// Catalog double recording every call. Failures are scripted by item name
/// (upserts) or identifier (deletes).
#[derive(Default)]
struct ScriptedCatalog {
    menu: Vec<MenuCategory>,
    failing_upserts: Vec<String>,
    failing_deletes: Vec<String>,
    upsert_without_id: bool,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedCatalog {
    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| predicate(c)).count()
    }
}

impl CatalogApi for ScriptedCatalog {
    fn fetch_menu(&self) -> mexsync::Result<Vec<MenuCategory>> {
        Ok(self.menu.clone())
    }

    fn upsert_item(&self, request: &ItemUpsertRequest) -> mexsync::Result<UpsertOutcome> {
        if self.failing_upserts.contains(&request.item.item_name) {
            return Err(SyncError::Remote {
                message: format!("rejected item '{}'", request.item.item_name),
            });
        }
        self.calls.borrow_mut().push(Call::Upsert {
            item_name: request.item.item_name.clone(),
            item_id: request.item.item_id.clone(),
            price: request.item.price_in_min,
        });
        if self.upsert_without_id {
            return Ok(UpsertOutcome { item_id: None });
        }
        let item_id = request
            .item
            .item_id
            .clone()
            .unwrap_or_else(|| format!("new-{}", self.calls.borrow().len()));
        Ok(UpsertOutcome {
            item_id: Some(item_id),
        })
    }

    fn set_stock(&self, item_id: &str, request: &StockRequest) -> mexsync::Result<()> {
        assert!(request.enable_inventory_management);
        self.calls.borrow_mut().push(Call::SetStock {
            item_id: item_id.to_string(),
            stock: request.current_stock,
        });
        Ok(())
    }

    fn set_availability(&self, item_ids: &[String], status: i32) -> mexsync::Result<()> {
        self.calls.borrow_mut().push(Call::SetAvailability {
            item_ids: item_ids.to_vec(),
            status,
        });
        Ok(())
    }

    fn delete_item(&self, item_id: &str) -> mexsync::Result<()> {
        if self.failing_deletes.contains(&item_id.to_string()) {
            return Err(SyncError::Remote {
                message: format!("cannot delete '{item_id}'"),
            });
        }
        self.calls.borrow_mut().push(Call::Delete {
            item_id: item_id.to_string(),
        });
        Ok(())
    }
}

fn menu_item(id: &str, name: &str) -> MenuItem {
    MenuItem {
        item_id: id.to_string(),
        item_name: name.to_string(),
        sku_id: format!("sku-{id}"),
        item_code: format!("sku-{id}"),
        description: String::new(),
        price_in_min: Some(10_000),
        weight: Some(Weight {
            unit: "ml".into(),
            count: Some(2),
            value: Some(250),
        }),
        image_url: None,
        item_class_id: "class".into(),
        selling_time_id: "time".into(),
        available_status: Some(1),
    }
}

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents).expect("test input written");
}

#[test]
fn export_flattens_categories_into_rows() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    let catalog = ScriptedCatalog {
        menu: vec![
            MenuCategory {
                category_id: "cat-1".into(),
                category_name: "Drinks".into(),
                items: vec![menu_item("i1", "Tea"), menu_item("i2", "Coffee")],
            },
            MenuCategory {
                category_id: "cat-2".into(),
                category_name: "Food".into(),
                items: vec![menu_item("i3", "Rice")],
            },
        ],
        ..ScriptedCatalog::default()
    };

    let exported = Engine::new(&catalog, files.clone()).export().expect("export");
    assert_eq!(exported, 3);

    let mut reader = csv::Reader::from_path(files.products()).expect("export readable");
    let rows: Vec<mexsync::model::ProductRow> = reader
        .deserialize()
        .collect::<Result<_, _>>()
        .expect("rows parsed");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].category, "Drinks");
    assert_eq!(rows[0].category_id, "cat-1");
    assert_eq!(rows[2].category, "Food");
    assert_eq!(rows[2].category_id, "cat-2");
    assert_eq!(rows[0].stock, "2");
    assert_eq!(rows[0].unit, "ml");
}

#[test]
fn update_continues_past_failures_and_writes_ledger() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    write_file(
        &files.products(),
        "itemID,itemName,priceInMin,stock,availableStatus,categoryID\n\
         i1,Tea,10000,5,1,cat-1\n\
         i2,Broken,10000,5,1,cat-1\n\
         i3,Rice,12000,5,1,cat-1\n",
    );

    let catalog = ScriptedCatalog {
        failing_upserts: vec!["Broken".into()],
        ..ScriptedCatalog::default()
    };
    let summary = Engine::new(&catalog, files.clone()).update().expect("update");

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(catalog.count(|c| matches!(c, Call::Upsert { .. })), 2);

    let failure_file = summary.failure_file.expect("failure file written");
    let contents = fs::read_to_string(&failure_file).expect("failure file readable");
    let mut lines = contents.lines();
    assert_eq!(
        lines.next().unwrap(),
        "itemID,itemName,priceInMin,stock,availableStatus,categoryID,logError"
    );
    let failed_row = lines.next().expect("one failed row");
    assert!(failed_row.starts_with("i2,Broken,10000,5,1,cat-1,"));
    assert!(failed_row.contains("rejected item 'Broken'"));
    assert_eq!(lines.next(), None);
}

#[test]
fn update_price_goes_out_unscaled() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    write_file(
        &files.products(),
        "itemID,itemName,priceInMin,stock,availableStatus,categoryID\ni1,Tea,15000,5,1,cat-1\n",
    );

    let catalog = ScriptedCatalog::default();
    Engine::new(&catalog, files).update().expect("update");

    assert!(catalog.calls().contains(&Call::Upsert {
        item_name: "Tea".into(),
        item_id: Some("i1".into()),
        price: Some(15_000),
    }));
}

#[test]
fn update_zero_stock_forces_out_of_stock_status() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    write_file(
        &files.products(),
        "itemID,itemName,priceInMin,stock,availableStatus,categoryID\ni1,Tea,15000,0,1,cat-1\n",
    );

    let catalog = ScriptedCatalog::default();
    Engine::new(&catalog, files).update().expect("update");

    assert!(catalog.calls().contains(&Call::SetAvailability {
        item_ids: vec!["i1".into()],
        status: STATUS_OUT_OF_STOCK,
    }));
}

#[test]
fn update_declared_policy_keeps_row_status() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    write_file(
        &files.products(),
        "itemID,itemName,priceInMin,stock,availableStatus,categoryID\ni1,Tea,15000,0,1,cat-1\n",
    );

    let catalog = ScriptedCatalog::default();
    Engine::new(&catalog, files)
        .with_policy(AvailabilityPolicy::DeclaredStatus)
        .update()
        .expect("update");

    assert!(catalog.calls().contains(&Call::SetAvailability {
        item_ids: vec!["i1".into()],
        status: 1,
    }));
}

#[test]
fn add_with_positive_stock_issues_only_set_stock() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    write_file(
        &files.upload(),
        "itemName,skuID,itemCode,priceInMin,weight,unit,stock,categoryID\n\
         Tea,sku-1,sku-1,12000,250,ml,5,cat-1\n",
    );

    let catalog = ScriptedCatalog::default();
    let summary = Engine::new(&catalog, files).add().expect("add");

    assert_eq!(summary.succeeded, 1);
    assert_eq!(catalog.count(|c| matches!(c, Call::SetStock { stock: 5, .. })), 1);
    assert_eq!(catalog.count(|c| matches!(c, Call::SetAvailability { .. })), 0);
    // Add-path price is the row value times 100.
    assert!(catalog.calls().iter().any(|c| matches!(
        c,
        Call::Upsert {
            price: Some(1_200_000),
            item_id: None,
            ..
        }
    )));
}

#[test]
fn add_with_zero_stock_issues_only_availability() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    write_file(
        &files.upload(),
        "itemName,skuID,itemCode,priceInMin,weight,unit,stock,categoryID\n\
         Tea,sku-1,sku-1,12000,250,ml,0,cat-1\n",
    );

    let catalog = ScriptedCatalog::default();
    Engine::new(&catalog, files).add().expect("add");

    assert_eq!(catalog.count(|c| matches!(c, Call::SetStock { .. })), 0);
    assert_eq!(
        catalog.count(|c| matches!(
            c,
            Call::SetAvailability {
                status: STATUS_OUT_OF_STOCK,
                ..
            }
        )),
        1
    );
}

#[test]
fn add_without_upload_writes_sample_and_makes_no_calls() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());

    let catalog = ScriptedCatalog::default();
    let summary = Engine::new(&catalog, files.clone()).add().expect("add");

    assert_eq!(summary.attempted, 0);
    assert!(catalog.calls().is_empty());
    assert!(files.upload_sample().exists());
    let sample = fs::read_to_string(files.upload_sample()).expect("sample readable");
    assert!(sample.starts_with("itemName,skuID,itemCode,"));
}

#[test]
fn add_records_missing_item_id_as_failure() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    write_file(
        &files.upload(),
        "itemName,skuID,itemCode,priceInMin,weight,unit,stock,categoryID\n\
         Tea,sku-1,sku-1,12000,250,ml,5,cat-1\n",
    );

    let catalog = ScriptedCatalog {
        upsert_without_id: true,
        ..ScriptedCatalog::default()
    };
    let summary = Engine::new(&catalog, files).add().expect("add");

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 1);
    // The upsert went through; only the follow-up was impossible.
    assert_eq!(catalog.count(|c| matches!(c, Call::Upsert { .. })), 1);
    assert_eq!(catalog.count(|c| matches!(c, Call::SetStock { .. })), 0);
    let contents =
        fs::read_to_string(summary.failure_file.expect("failure file")).expect("readable");
    assert!(contents.contains("could not attach stock"));
}

#[test]
fn reprice_requires_both_inputs() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    // Product export exists, POS file does not.
    write_file(&files.products(), "itemID,itemName,skuID,categoryID\n");

    let catalog = ScriptedCatalog::default();
    let result = Engine::new(&catalog, files).reprice(10);

    assert!(matches!(result, Err(SyncError::MissingInput(_))));
    assert!(catalog.calls().is_empty());
}

#[test]
fn reprice_applies_markup_and_follow_up() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    write_file(
        &files.products(),
        "itemID,itemName,skuID,itemCode,weight,unit,categoryID\n\
         i1,Tea,sku-1,sku-1,250,ml,cat-1\n",
    );
    write_file(
        &files.pos_export(),
        "Item Code,Item Name,Normal Price,Quantity,UoM\n\
         sku-1,Tea,\"10,000\",3,botol\n\
         sku-unknown,Ghost,5000,1,pcs\n",
    );

    let catalog = ScriptedCatalog::default();
    let summary = Engine::new(&catalog, files).reprice(10).expect("reprice");

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    assert!(catalog.calls().contains(&Call::Upsert {
        item_name: "Tea".into(),
        item_id: Some("i1".into()),
        price: Some(11_000),
    }));
    assert!(catalog.calls().contains(&Call::SetStock {
        item_id: "i1".into(),
        stock: 3,
    }));

    let contents =
        fs::read_to_string(summary.failure_file.expect("failure file")).expect("readable");
    assert!(contents.contains("SKU not found in product export: sku-unknown"));
}

#[test]
fn delete_skips_rows_without_identifier() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    write_file(
        &files.delete_list(),
        "itemID,note\ni1,first\n,no id here\ni3,third\n",
    );

    let catalog = ScriptedCatalog::default();
    let summary = Engine::new(&catalog, files).delete().expect("delete");

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.failure_file, None);
    assert_eq!(catalog.count(|c| matches!(c, Call::Delete { .. })), 2);
}

#[test]
fn delete_accepts_alternative_id_columns() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    write_file(&files.delete_list(), "id\nlegacy-9\n");

    let catalog = ScriptedCatalog::default();
    let summary = Engine::new(&catalog, files).delete().expect("delete");

    assert_eq!(summary.succeeded, 1);
    assert!(catalog.calls().contains(&Call::Delete {
        item_id: "legacy-9".into(),
    }));
}

#[test]
fn delete_records_remote_failures() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    write_file(&files.delete_list(), "itemID\ni1\ni2\n");

    let catalog = ScriptedCatalog {
        failing_deletes: vec!["i2".into()],
        ..ScriptedCatalog::default()
    };
    let summary = Engine::new(&catalog, files).delete().expect("delete");

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    let contents =
        fs::read_to_string(summary.failure_file.expect("failure file")).expect("readable");
    assert!(contents.contains("cannot delete 'i2'"));
}

#[test]
fn missing_inputs_are_fatal_before_any_call() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());

    let catalog = ScriptedCatalog::default();
    let engine = Engine::new(&catalog, files);

    assert!(matches!(engine.update(), Err(SyncError::MissingInput(_))));
    assert!(matches!(engine.delete(), Err(SyncError::MissingInput(_))));
    assert!(matches!(engine.reprice(10), Err(SyncError::MissingInput(_))));
    assert!(catalog.calls().is_empty());
}

#[test]
fn no_failure_file_when_everything_succeeds() {
    let dir = tempdir().expect("temporary directory");
    let files = BatchFiles::new(dir.path());
    write_file(
        &files.products(),
        "itemID,itemName,priceInMin,stock,availableStatus,categoryID\ni1,Tea,10000,5,1,cat-1\n",
    );

    let catalog = ScriptedCatalog::default();
    let summary = Engine::new(&catalog, files.clone()).update().expect("update");

    assert_eq!(summary.failed, 0);
    assert_eq!(summary.failure_file, None);
    assert!(!files.update_failures().exists());
}

#[test]
fn session_store_round_trips() {
    let dir = tempdir().expect("temporary directory");
    let store = SessionStore::new(dir.path().join("merchant-session.json"));
    assert_eq!(store.load().expect("load"), None);

    let session = Session {
        auth_token: "jwt-token".into(),
        merchant_entity_id: "merchant-1".into(),
        merchant_group_entity_id: "group-1".into(),
        login_time: chrono::Utc::now(),
    };
    store.save(&session).expect("save");
    assert_eq!(store.load().expect("load"), Some(session));
}
