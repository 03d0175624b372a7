// ==========================================
// Excel 导入系统 - ImportApi 端到端测试
// ==========================================
// 流程: AppState 组装 → 保存映射 → 预检 → 启动导入 → 订阅进度直到终态
// ==========================================

mod test_helpers;

use excel_import::app::AppState;
use excel_import::config::config_keys;
use excel_import::domain::{FieldMapping, PreviewOutcome, RunStatus};
use test_helpers::{
    collect_until_terminal, count_records, create_test_env, load_records, seed_mapping,
    write_contacts, write_xlsx, Cell, TestEnv,
};

async fn setup() -> (TestEnv, AppState) {
    let env = create_test_env().expect("创建测试环境失败");
    let state = AppState::new(env.db_path.clone(), env.site_path.clone())
        .await
        .expect("初始化AppState失败");
    (env, state)
}

async fn seed_contact_mapping(env: &TestEnv) {
    seed_mapping(
        &env.db_path,
        "Contact",
        &[("Name", "title"), ("Email", "email_addr")],
        Some("email_addr"),
    )
    .await
    .expect("写入映射失败");
}

// ==========================================
// 可导入实体类型
// ==========================================

#[tokio::test]
async fn test_list_importable_entity_types() {
    let (_env, state) = setup().await;
    let api = &state.import_api;

    for name in ["Contact", "Customer", "Lead", "excel_field_mapping"] {
        api.register_entity_type(name, false).await.unwrap();
    }
    api.register_entity_type("Contact Phone", true).await.unwrap();

    let all = api.list_importable_entity_types(None, 0, 0).await.unwrap();
    assert_eq!(all, vec!["Contact", "Customer", "Lead"]);

    let filtered = api
        .list_importable_entity_types(Some("cust"), 0, 20)
        .await
        .unwrap();
    assert_eq!(filtered, vec!["Customer"]);

    let page = api.list_importable_entity_types(None, 1, 1).await.unwrap();
    assert_eq!(page, vec!["Customer"]);
}

#[tokio::test]
async fn test_save_mapping_registers_entity_type() {
    let (_env, state) = setup().await;
    let api = &state.import_api;

    let mapping = FieldMapping::from_pairs(vec![("Name", "title")]);
    api.save_mapping("Supplier", mapping, None).await.unwrap();

    let names = api.list_importable_entity_types(None, 0, 20).await.unwrap();
    assert_eq!(names, vec!["Supplier"]);

    let err = api
        .save_mapping("Supplier", FieldMapping::new(), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
}

// ==========================================
// 导入预检
// ==========================================

#[tokio::test]
async fn test_preview_reports_column_differences() {
    let (env, state) = setup().await;
    seed_mapping(
        &env.db_path,
        "Contact",
        &[("Name", "title"), ("Email", "email_addr"), ("Mobile", "mobile_no")],
        Some("email_addr"),
    )
    .await
    .unwrap();

    write_xlsx(
        &env.files_dir().join("contacts.xlsx"),
        &["Name", "Email", "Phone"],
        &[vec![Cell::Text("Alice"), Cell::Text("a@x.com"), Cell::Text("555")]],
    )
    .unwrap();

    let outcome = state
        .import_api
        .preview_import("Contact", "/private/files/contacts.xlsx")
        .await;

    let report = outcome.report().expect("预检应成功");
    assert_eq!(report.total_excel_columns, 3);
    assert_eq!(report.mapped_fields, vec!["Name", "Email"]);
    assert_eq!(report.missing_fields, vec!["Phone"]);
    assert_eq!(report.missing_in_excel, vec!["Mobile"]);
    assert!(report.has_missing);

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "success");
}

#[tokio::test]
async fn test_preview_errors_are_structured() {
    let (env, state) = setup().await;
    seed_contact_mapping(&env).await;

    let outcome = state
        .import_api
        .preview_import("Contact", "/private/files/missing.xlsx")
        .await;
    assert!(matches!(outcome, PreviewOutcome::Error { .. }));

    write_contacts(&env.files_dir().join("c.xlsx"), &[("Alice", "a@x.com")]).unwrap();
    let outcome = state
        .import_api
        .preview_import("Unknown", "/private/files/c.xlsx")
        .await;
    assert!(!outcome.is_success());

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "error");
    assert!(json["message"].is_string());
}

// ==========================================
// 启动导入 - 校验阶段
// ==========================================

#[tokio::test]
async fn test_start_import_validation_errors() {
    let (env, state) = setup().await;
    let api = &state.import_api;

    let err = api.start_import("", "/x.xlsx", true, true, None).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");

    let err = api
        .start_import("Contact", "/private/files/c.xlsx", true, true, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "MAPPING_NOT_FOUND");

    seed_contact_mapping(&env).await;

    let err = api
        .start_import("Contact", "/private/files/missing.xlsx", true, true, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    std::fs::write(env.files_dir().join("contacts.csv"), "Name,Email\n").unwrap();
    let err = api
        .start_import("Contact", "/private/files/contacts.csv", true, true, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_FORMAT");

    let err = api
        .start_import("Contact", "/private/files/../../secret.xlsx", true, true, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
}

// ==========================================
// 启动导入 - 后台执行
// ==========================================

#[tokio::test]
async fn test_start_import_runs_in_background() {
    let (env, state) = setup().await;
    seed_contact_mapping(&env).await;
    write_contacts(
        &env.files_dir().join("contacts.xlsx"),
        &[("Alice", "a@x.com"), ("Bob", "b@x.com")],
    )
    .unwrap();

    let mut rx = state.events.subscribe();
    let response = state
        .import_api
        .start_import("Contact", "/private/files/contacts.xlsx", true, true, Some("alice"))
        .await
        .unwrap();
    assert_eq!(response.status, "success");
    assert_eq!(response.message, "Import started successfully");

    let events = collect_until_terminal(&mut rx).await;
    state.runner.join_all().await;

    let last = events.last().expect("应收到终态事件");
    assert_eq!(last.status, RunStatus::Completed);
    assert_eq!(last.progress_percent, 100);
    assert_eq!(last.message, "Import completed: 2 created, 0 updated, 0 skipped");
    assert!(events.windows(2).all(|w| w[0].progress_percent <= w[1].progress_percent));

    assert_eq!(count_records(&env.db_path, "Contact").unwrap(), 2);
    assert!(!env.files_dir().join("contacts.xlsx").exists());
}

#[tokio::test]
async fn test_start_import_addresses_events_to_user() {
    let (env, state) = setup().await;
    seed_contact_mapping(&env).await;
    state
        .config
        .set_config_value(config_keys::PROGRESS_TOPIC, "contact_import")
        .unwrap();
    write_contacts(&env.files_dir().join("c.xlsx"), &[("Alice", "a@x.com")]).unwrap();

    let mut rx = state.events.subscribe();
    state
        .import_api
        .start_import("Contact", "c.xlsx", true, true, Some("alice"))
        .await
        .unwrap();

    let message = tokio::time::timeout(std::time::Duration::from_secs(30), rx.recv())
        .await
        .expect("等待进度事件超时")
        .unwrap();
    assert_eq!(message.topic, "contact_import");
    assert_eq!(message.user.as_deref(), Some("alice"));

    state.runner.join_all().await;
}

#[tokio::test]
async fn test_start_import_public_file_and_update() {
    let (env, state) = setup().await;
    seed_contact_mapping(&env).await;

    let first = env.files_dir().join("first.xlsx");
    write_contacts(&first, &[("Alice", "a@x.com")]).unwrap();
    let mut rx = state.events.subscribe();
    state
        .import_api
        .start_import("Contact", "/private/files/first.xlsx", true, true, None)
        .await
        .unwrap();
    collect_until_terminal(&mut rx).await;

    // 公共目录中的文件按文件名兜底查找
    let public = env.site_path.join("public").join("files").join("second.xlsx");
    write_contacts(&public, &[("Alice Smith", "a@x.com"), ("Bob", "b@x.com")]).unwrap();
    state
        .import_api
        .start_import("Contact", "/files/second.xlsx", false, true, None)
        .await
        .unwrap();
    let events = collect_until_terminal(&mut rx).await;
    state.runner.join_all().await;

    let last = events.last().unwrap();
    assert_eq!(last.message, "Import completed: 0 created, 1 updated, 1 skipped");

    let records = load_records(&env.db_path, "Contact").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["title"], "Alice Smith");
}

#[tokio::test]
async fn test_start_import_with_chinese_locale() {
    let (env, state) = setup().await;
    seed_contact_mapping(&env).await;
    state
        .config
        .set_config_value(config_keys::LOCALE, "zh-CN")
        .unwrap();
    write_xlsx(&env.files_dir().join("empty.xlsx"), &["Name", "Email"], &[]).unwrap();

    let mut rx = state.events.subscribe();
    let response = state
        .import_api
        .start_import("Contact", "empty.xlsx", true, true, None)
        .await
        .unwrap();
    assert_eq!(response.message, "导入任务已启动");

    let events = collect_until_terminal(&mut rx).await;
    state.runner.join_all().await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, RunStatus::Error);
    assert_eq!(events[0].message, "Excel 文件中没有数据");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_import_timeout_publishes_error() {
    let (env, state) = setup().await;
    seed_contact_mapping(&env).await;
    state
        .config
        .set_config_value(config_keys::IMPORT_TIMEOUT_SECS, "1")
        .unwrap();
    write_contacts(&env.files_dir().join("c.xlsx"), &[("Alice", "a@x.com")]).unwrap();

    // 其他连接持有写锁，运行在开启事务时等待直至超时
    let blocker = excel_import::db::open_sqlite_connection(&env.db_path).unwrap();
    blocker.execute_batch("BEGIN IMMEDIATE").unwrap();

    let mut rx = state.events.subscribe();
    state
        .import_api
        .start_import("Contact", "c.xlsx", true, true, None)
        .await
        .unwrap();

    let events = collect_until_terminal(&mut rx).await;
    let last = events.last().expect("应收到终态事件");
    assert_eq!(last.status, RunStatus::Error);
    assert_eq!(last.progress_percent, 0);
    assert_eq!(last.message, "Import failed: Import exceeded the 1s time limit");

    blocker.execute_batch("ROLLBACK").unwrap();
    state.runner.join_all().await;
    assert_eq!(count_records(&env.db_path, "Contact").unwrap(), 0);
}
