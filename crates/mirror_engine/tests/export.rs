mod common;

use std::fs;
use std::sync::Arc;

use common::{files_under, init_logging, FakeStore};
use mirror_core::{ExportPath, PageId, VisitedSet};
use mirror_engine::{ExportError, ExportSummary, PageExporter, PendingPage, SpaceWalker};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn walker(store: &Arc<FakeStore>, out: &TempDir) -> SpaceWalker {
    SpaceWalker::new(store.clone(), PageExporter::new(store.clone(), out.path()))
}

fn docs_store() -> FakeStore {
    FakeStore::new()
        .space("DOCS", Some("1"))
        .page("1", "Home", &["2"], "<p>Welcome</p>")
        .page("2", "Getting Started", &[], "<p>Step one</p>")
}

#[tokio::test]
async fn homepage_is_index_and_leaf_keeps_title() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = docs_store().into_shared();

    let summary = walker(&store, &out).dump(None).await.expect("export ok");

    assert_eq!(
        files_under(out.path()),
        vec!["DOCS/Home/Getting Started.html", "DOCS/index.html"]
    );
    assert_eq!(
        fs::read_to_string(out.path().join("DOCS/index.html")).unwrap(),
        "<p>Welcome</p>"
    );
    assert_eq!(
        summary,
        ExportSummary {
            spaces: 1,
            pages: 2,
            ..ExportSummary::default()
        }
    );
}

#[tokio::test]
async fn pages_are_visited_depth_first_in_store_order() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = FakeStore::new()
        .space("DOCS", Some("1"))
        .page("1", "Home", &["2", "5"], "")
        .page("2", "Guides", &["3", "4"], "")
        .page("3", "Install", &[], "")
        .page("4", "Upgrade", &[], "")
        .page("5", "FAQ", &[], "")
        .into_shared();

    walker(&store, &out).dump(None).await.unwrap();

    assert_eq!(store.page_requests(), vec!["1", "2", "3", "4", "5"]);
    assert_eq!(
        files_under(out.path()),
        vec![
            "DOCS/Home/FAQ.html",
            "DOCS/Home/Guides/Install.html",
            "DOCS/Home/Guides/Upgrade.html",
            "DOCS/Home/index.html",
            "DOCS/index.html",
        ]
    );
}

#[tokio::test]
async fn repeated_child_id_is_fatal() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = FakeStore::new()
        .space("DOCS", Some("1"))
        .page("1", "Home", &["2", "2"], "")
        .page("2", "Twice", &[], "")
        .into_shared();

    let err = walker(&store, &out).dump(None).await.unwrap_err();

    assert!(matches!(err, ExportError::DuplicatePage(ref id) if id.as_str() == "2"));
    assert_eq!(store.page_requests(), vec!["1", "2"]);
    assert_eq!(
        files_under(out.path()),
        vec!["DOCS/Home/Twice.html", "DOCS/index.html"]
    );
}

#[tokio::test]
async fn cycle_in_child_graph_is_fatal() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = FakeStore::new()
        .space("DOCS", Some("1"))
        .page("1", "Home", &["2"], "")
        .page("2", "Loop", &["1"], "")
        .into_shared();

    let err = walker(&store, &out).dump(None).await.unwrap_err();

    assert!(matches!(err, ExportError::DuplicatePage(ref id) if id.as_str() == "1"));
}

#[tokio::test]
async fn page_shared_between_spaces_is_fatal() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = FakeStore::new()
        .space("A", Some("1"))
        .space("B", Some("1"))
        .page("1", "Home", &[], "")
        .into_shared();

    let err = walker(&store, &out).dump(None).await.unwrap_err();

    assert!(matches!(err, ExportError::DuplicatePage(_)));
    assert_eq!(files_under(out.path()), vec!["A/Home.html"]);
}

#[tokio::test]
async fn space_without_homepage_aborts_the_run() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = FakeStore::new()
        .space("EMPTY", None)
        .space("DOCS", Some("1"))
        .page("1", "Home", &[], "")
        .into_shared();

    let err = walker(&store, &out).dump(None).await.unwrap_err();

    assert!(matches!(err, ExportError::NoHomepage(ref key) if key == "EMPTY"));
    assert!(store.page_requests().is_empty());
    assert!(files_under(out.path()).is_empty());
}

#[tokio::test]
async fn missing_homepage_after_exported_space_keeps_earlier_output() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = FakeStore::new()
        .space("DOCS", Some("1"))
        .space("EMPTY", None)
        .page("1", "Home", &[], "")
        .into_shared();

    let err = walker(&store, &out).dump(None).await.unwrap_err();

    assert!(matches!(err, ExportError::NoHomepage(_)));
    assert_eq!(files_under(out.path()), vec!["DOCS/Home.html"]);
}

#[tokio::test]
async fn space_filter_selects_one_space() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = FakeStore::new()
        .space("DOCS", Some("1"))
        .space("OPS", Some("9"))
        .page("1", "Home", &[], "")
        .page("9", "Runbooks", &[], "")
        .into_shared();

    let summary = walker(&store, &out).dump(Some("OPS")).await.unwrap();

    assert_eq!(summary.spaces, 1);
    assert_eq!(store.space_filters(), vec![Some("OPS".to_string())]);
    assert_eq!(files_under(out.path()), vec!["OPS/Runbooks.html"]);
}

#[tokio::test]
async fn filtered_out_space_without_homepage_is_ignored() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = FakeStore::new()
        .space("BROKEN", None)
        .space("OPS", Some("9"))
        .page("9", "Runbooks", &[], "")
        .into_shared();

    let summary = walker(&store, &out).dump(Some("OPS")).await.unwrap();

    assert_eq!(summary.spaces, 1);
}

#[tokio::test]
async fn zero_spaces_is_not_an_error() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = FakeStore::new().into_shared();

    let summary = walker(&store, &out).dump(None).await.unwrap();

    assert_eq!(summary, ExportSummary::default());
    assert!(files_under(out.path()).is_empty());
}

#[tokio::test]
async fn dangerous_titles_are_sanitized() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = FakeStore::new()
        .space("DOCS", Some("1"))
        .page("1", "Home", &["2"], "")
        .page("2", "Ops/Runbooks", &["3"], "")
        .page("3", "../../etc/passwd", &[], "gotcha")
        .into_shared();

    walker(&store, &out).dump(None).await.unwrap();

    assert_eq!(
        files_under(out.path()),
        vec![
            "DOCS/Home/Ops_Runbooks/____etc_passwd.html",
            "DOCS/Home/index.html",
            "DOCS/index.html",
        ]
    );
}

#[tokio::test]
async fn dot_and_empty_titles_get_their_own_location() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = FakeStore::new()
        .space("DOCS", Some("1"))
        .page("1", "Home", &["2"], "home")
        .page("2", ".", &["3"], "dot-one")
        .page("3", ".", &["4", "5"], "dot-two")
        .page("4", "leaf", &[], "leaf")
        .page("5", "", &[], "untitled")
        .into_shared();

    let summary = walker(&store, &out).dump(None).await.unwrap();

    assert_eq!(summary.pages, 5);
    assert_eq!(
        files_under(out.path()),
        vec![
            "DOCS/Home/_/_/_.html",
            "DOCS/Home/_/_/leaf.html",
            "DOCS/Home/_/index.html",
            "DOCS/Home/index.html",
            "DOCS/index.html",
        ]
    );
    assert_eq!(
        fs::read_to_string(out.path().join("DOCS/Home/index.html")).unwrap(),
        "dot-one"
    );
    assert_eq!(
        fs::read_to_string(out.path().join("DOCS/Home/_/index.html")).unwrap(),
        "dot-two"
    );
}

#[tokio::test]
async fn export_page_returns_children_as_pending_work() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = FakeStore::new()
        .page("1", "Home", &["2", "3"], "<p>x</p>")
        .into_shared();
    let exporter = PageExporter::new(store.clone(), out.path());
    let mut visited = VisitedSet::new();

    let exported = exporter
        .export_page(&PageId::from("1"), &ExportPath::root("DOCS"), &mut visited)
        .await
        .unwrap();

    assert_eq!(exported.path, out.path().join("DOCS").join("index.html"));
    let child_dir = ExportPath::root("DOCS").child("Home");
    assert_eq!(
        exported.children,
        vec![
            PendingPage {
                id: PageId::from("2"),
                ancestors: child_dir.clone(),
            },
            PendingPage {
                id: PageId::from("3"),
                ancestors: child_dir,
            },
        ]
    );
    assert!(visited.contains(&PageId::from("1")));

    let again = exporter
        .export_page(&PageId::from("1"), &ExportPath::root("DOCS"), &mut visited)
        .await;
    assert!(matches!(again, Err(ExportError::DuplicatePage(_))));
}

#[tokio::test]
async fn deep_trees_do_not_recurse_and_depth_matches_segments() {
    init_logging();
    const DEPTH: usize = 150;
    let out = TempDir::new().unwrap();

    let mut store = FakeStore::new().space("DOCS", Some("0"));
    let ids: Vec<String> = (0..=DEPTH).map(|i| i.to_string()).collect();
    for i in 0..DEPTH {
        store = store.page(&ids[i], "p", &[ids[i + 1].as_str()], "");
    }
    store = store.page(&ids[DEPTH], "leaf", &[], "bottom");
    let store = store.into_shared();

    let summary = walker(&store, &out).dump(None).await.unwrap();
    assert_eq!(summary.pages, DEPTH + 1);

    let files = files_under(out.path());
    let deepest = files.iter().find(|f| f.ends_with("leaf.html")).unwrap();
    // space key, one directory per ancestor page, then the file
    assert_eq!(deepest.split('/').count(), 1 + (DEPTH + 1));
}

#[tokio::test]
async fn independent_runs_do_not_share_visited_state() {
    init_logging();
    let out = TempDir::new().unwrap();
    let store = docs_store().into_shared();
    let walker = walker(&store, &out);

    walker.dump(None).await.unwrap();
    fs::write(out.path().join("DOCS/index.html"), "stale").unwrap();
    walker.dump(None).await.unwrap();

    assert_eq!(
        fs::read_to_string(out.path().join("DOCS/index.html")).unwrap(),
        "<p>Welcome</p>"
    );
}
