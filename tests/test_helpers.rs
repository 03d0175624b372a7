// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库/站点目录、映射种子数据、Excel 测试文件生成
// ==========================================
#![allow(dead_code)]

use excel_import::db::{init_schema, open_sqlite_connection};
use excel_import::domain::{FieldMapping, MappingDocument, ProgressEvent};
use excel_import::repository::{
    EntityTypeCatalog, FieldMappingRepository, SqliteEntityStore, SqliteFieldMappingRepository,
};
use excel_import::services::ChannelMessage;
use rust_xlsxwriter::Workbook;
use std::error::Error;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::sync::broadcast;

/// 测试环境：临时目录下的数据库文件与站点目录
pub struct TestEnv {
    _dir: TempDir,
    pub db_path: String,
    pub site_path: PathBuf,
}

impl TestEnv {
    /// 站点内上传文件目录（site/private/files）
    pub fn files_dir(&self) -> PathBuf {
        self.site_path.join("private").join("files")
    }
}

/// 创建临时测试数据库并初始化 schema
pub fn create_test_env() -> Result<TestEnv, Box<dyn Error>> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("test.db").to_string_lossy().to_string();
    let site_path = dir.path().join("site");
    std::fs::create_dir_all(site_path.join("private").join("files"))?;
    std::fs::create_dir_all(site_path.join("public").join("files"))?;

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok(TestEnv {
        _dir: dir,
        db_path,
        site_path,
    })
}

/// 写入映射文档并登记实体类型
pub async fn seed_mapping(
    db_path: &str,
    entity_type: &str,
    pairs: &[(&str, &str)],
    unique_field: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let mapping = FieldMapping::from_pairs(pairs.iter().copied());
    let mut document = MappingDocument::new(entity_type, mapping);
    if let Some(field) = unique_field {
        document = document.with_unique_field(field);
    }

    let repo = SqliteFieldMappingRepository::new(db_path)?;
    repo.save_mapping(&document).await?;

    let store = SqliteEntityStore::new(db_path)?;
    store.register_entity_type(entity_type, false).await?;
    Ok(())
}

/// Excel 测试单元格
#[derive(Debug, Clone)]
pub enum Cell {
    Text(&'static str),
    Number(f64),
    Empty,
}

/// 生成单工作表的 xlsx 文件
pub fn write_xlsx(path: &Path, headers: &[&str], rows: &[Vec<Cell>]) -> Result<(), Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }
    for (r, row) in rows.iter().enumerate() {
        let excel_row = (r + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(v) => {
                    sheet.write_string(excel_row, col as u16, *v)?;
                }
                Cell::Number(v) => {
                    sheet.write_number(excel_row, col as u16, *v)?;
                }
                Cell::Empty => {}
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// 联系人测试文件：Name / Email 两列
pub fn write_contacts<S: AsRef<str>>(path: &Path, contacts: &[(S, S)]) -> Result<(), Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Name")?;
    sheet.write_string(0, 1, "Email")?;
    for (r, (name, email)) in contacts.iter().enumerate() {
        let excel_row = (r + 1) as u32;
        sheet.write_string(excel_row, 0, name.as_ref())?;
        sheet.write_string(excel_row, 1, email.as_ref())?;
    }
    workbook.save(path)?;
    Ok(())
}

/// 统计某实体类型的记录数
pub fn count_records(db_path: &str, kind: &str) -> Result<i64, Box<dyn Error>> {
    let conn = open_sqlite_connection(db_path)?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM record WHERE kind = ?1",
        [kind],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// 读取某实体类型全部记录的 JSON 数据（按创建顺序）
pub fn load_records(db_path: &str, kind: &str) -> Result<Vec<serde_json::Value>, Box<dyn Error>> {
    let conn = open_sqlite_connection(db_path)?;
    let mut stmt = conn.prepare(
        "SELECT data FROM record WHERE kind = ?1 ORDER BY created_at, rowid",
    )?;
    let rows = stmt.query_map([kind], |row| row.get::<_, String>(0))?;

    let mut records = Vec::new();
    for raw in rows {
        records.push(serde_json::from_str(&raw?)?);
    }
    Ok(records)
}

/// 文件目录记录数
pub fn count_catalog_entries(db_path: &str, file_url: &str) -> Result<i64, Box<dyn Error>> {
    let conn = open_sqlite_connection(db_path)?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM file_catalog WHERE file_url = ?1",
        [file_url],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// 取出通道中已到达的全部进度事件
pub fn drain_events(rx: &mut broadcast::Receiver<ChannelMessage>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let Ok(event) = serde_json::from_value(message.payload) {
            events.push(event);
        }
    }
    events
}

/// 等待直到收到终态事件，返回途中收到的全部事件
pub async fn collect_until_terminal(
    rx: &mut broadcast::Receiver<ChannelMessage>,
) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    loop {
        let message = match tokio::time::timeout(std::time::Duration::from_secs(30), rx.recv()).await
        {
            Ok(Ok(message)) => message,
            _ => break,
        };
        let event: ProgressEvent = match serde_json::from_value(message.payload) {
            Ok(event) => event,
            Err(_) => continue,
        };
        let terminal = event.status.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
    }
    events
}
