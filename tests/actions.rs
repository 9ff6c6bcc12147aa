//! Action-level tests against a file-backed store.
//!
//! Covers the authorization boundary, the license gate and a full export to
//! import cycle through the same entry points the CLI uses.
#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::NaiveDate;
use postport::actions::{
    EXPORT_ACTION, IMPORT_ACTION, ImportSignal, LICENSE_ACTION, Upload, activate_license,
    export_posts, import_posts,
};
use postport::io::ImportOptions;
use postport::license::{FileActivationStore, LicenseGate, StaticKeyValidator};
use postport::security::{CsrfGuard, Operator, Role};
use postport::storage::{ContentStore, SqliteStore, UserDirectory};
use postport::{ActionContext, ActionResponse, Error, NewPost};
use secrecy::SecretString;
use std::path::Path;
use std::sync::Arc;

struct Site {
    _dir: tempfile::TempDir,
    store: Arc<SqliteStore>,
    context: ActionContext,
    admin: Operator,
}

fn site(secret: &str) -> Site {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("postport.db")).unwrap());
    let admin = store.add_user("admin", "Site Admin").unwrap();
    let context = ActionContext::new(
        store.clone(),
        store.clone(),
        CsrfGuard::new(SecretString::from(secret.to_string())),
    );
    Site {
        _dir: dir,
        store,
        context,
        admin: Operator::new(admin, Role::Administrator),
    }
}

fn licensed(site: Site, data_dir: &Path) -> Site {
    let gate = LicenseGate::new(
        Arc::new(StaticKeyValidator::new(["PP-GOOD-KEY"])),
        Arc::new(FileActivationStore::in_dir(data_dir)),
    );
    Site {
        context: site.context.with_license(gate).require_license(true),
        ..site
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
}

fn write_upload(dir: &Path, name: &str, contents: &[u8]) -> Upload {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    Upload::new(name, path)
}

#[test]
fn test_export_then_import_into_another_site() {
    let source = site("source-secret");
    let jane = source.store.add_user("jdoe", "Jane Doe").unwrap();
    for (day, title) in [(1, "Alpha"), (2, "Beta, with comma"), (3, "Gamma \"quoted\"")] {
        let at = NaiveDate::from_ymd_opt(2024, 2, day)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .unwrap();
        source
            .store
            .insert(&NewPost::published(title, "<p>Body text</p>", at, jane.id))
            .unwrap();
    }

    let token = source.context.issue_token(EXPORT_ACTION, &source.admin).unwrap();
    let ActionResponse::Download { body, .. } =
        export_posts(&source.context, &source.admin, Some(&token), today()).unwrap()
    else {
        panic!("expected a download");
    };

    let target = site("target-secret");
    target.store.add_user("jane", "Jane Doe").unwrap();
    let upload_dir = tempfile::tempdir().unwrap();
    let upload = write_upload(upload_dir.path(), "export.csv", &body);
    let token = target.context.issue_token(IMPORT_ACTION, &target.admin).unwrap();

    let response = import_posts(
        &target.context,
        &target.admin,
        Some(&token),
        Some(&upload),
        &ImportOptions::default(),
        None,
    )
    .unwrap();
    assert_eq!(response.signal, ImportSignal::Success);
    assert_eq!(
        response.response().location().as_deref(),
        Some("?page=postport&import=success")
    );

    let page = target.store.published_page(None, 10).unwrap();
    let titles: Vec<_> = page.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Gamma \"quoted\"", "Beta, with comma", "Alpha"]);
    let jane_there = target.store.find_by_display_name("Jane Doe").unwrap();
    assert!(page.iter().all(|p| Some(p.author) == jane_there));
    assert_eq!(page[2].published_at_display(), "2024-02-01 10:30:00");
}

#[test]
fn test_tokens_do_not_cross_sites_or_actions() {
    let a = site("secret-a");
    let b = site("secret-b");
    let token = a.context.issue_token(EXPORT_ACTION, &a.admin).unwrap();

    assert!(matches!(
        export_posts(&b.context, &b.admin, Some(&token), today()),
        Err(Error::Unauthorized(_))
    ));
    assert!(matches!(
        import_posts(&a.context, &a.admin, Some(&token), None, &ImportOptions::default(), None),
        Err(Error::Unauthorized(_))
    ));
}

#[test]
fn test_subscriber_cannot_export() {
    let s = site("secret");
    let reader = s.store.add_user("reader", "Reader").unwrap();
    let reader = Operator::new(reader, Role::Subscriber);
    let token = s.context.issue_token(EXPORT_ACTION, &reader).unwrap();

    let err = export_posts(&s.context, &reader, Some(&token), today()).unwrap_err();
    assert!(err.to_string().contains("manage_options"));
}

#[test]
fn test_license_gate_blocks_until_activation() {
    let state_dir = tempfile::tempdir().unwrap();
    let s = licensed(site("secret"), state_dir.path());
    let export_token = s.context.issue_token(EXPORT_ACTION, &s.admin).unwrap();

    assert!(matches!(
        export_posts(&s.context, &s.admin, Some(&export_token), today()),
        Err(Error::NotActivated(_))
    ));

    let license_token = s.context.issue_token(LICENSE_ACTION, &s.admin).unwrap();
    let rejected =
        activate_license(&s.context, &s.admin, Some(&license_token), "PP-BAD-KEY").unwrap();
    assert!(!rejected.activated);
    assert!(export_posts(&s.context, &s.admin, Some(&export_token), today()).is_err());

    let accepted =
        activate_license(&s.context, &s.admin, Some(&license_token), " PP-GOOD-KEY ").unwrap();
    assert!(accepted.activated);
    assert_eq!(
        export_posts(&s.context, &s.admin, Some(&export_token), today()).unwrap(),
        ActionResponse::redirect("export", "success")
    );

    // Activation survives a new gate over the same state directory.
    let reopened = licensed(site("secret"), state_dir.path());
    assert!(reopened.context.license().unwrap().is_activated().unwrap());
}

#[test]
fn test_wrong_extension_is_error_signal() {
    let s = site("secret");
    let dir = tempfile::tempdir().unwrap();
    let upload = write_upload(
        dir.path(),
        "posts.xlsx",
        b"ID,Title,Content,Date,Author\n1,a,b,2024-01-01,x\n",
    );
    let token = s.context.issue_token(IMPORT_ACTION, &s.admin).unwrap();

    let response = import_posts(
        &s.context,
        &s.admin,
        Some(&token),
        Some(&upload),
        &ImportOptions::default(),
        None,
    )
    .unwrap();
    assert_eq!(response.signal, ImportSignal::Error);
    assert_eq!(
        response.response(),
        ActionResponse::redirect("import", "error")
    );
    assert_eq!(s.store.count_published().unwrap(), 0);
}
