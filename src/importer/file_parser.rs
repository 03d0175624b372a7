// ==========================================
// Excel 导入系统 - 工作表读取
// ==========================================
// 支持: Excel (.xlsx/.xls)，只读取第一个工作表
// 表头规则: 去除首尾空白；空表头命名为 "Unnamed: {列序}"
// ==========================================

use crate::domain::{ImportRow, SheetData};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::normalize_cell;
use calamine::{open_workbook, open_workbook_auto, Data, DataRef, Reader, Xlsx};
use std::path::Path;
use tracing::debug;

fn header_name(raw: &str, column_index: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("Unnamed: {}", column_index)
    } else {
        trimmed.to_string()
    }
}

fn data_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn data_ref_text(cell: &DataRef<'_>) -> String {
    match cell {
        DataRef::String(s) => s.clone(),
        DataRef::SharedString(s) => s.to_string(),
        DataRef::Int(i) => i.to_string(),
        DataRef::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        DataRef::Float(f) => f.to_string(),
        DataRef::Bool(b) => b.to_string(),
        DataRef::DateTimeIso(s) | DataRef::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false)
}

/// 只读取表头行
///
/// .xlsx 按单元格流式读取，遇到第二行即停止，不物化任何数据行；
/// .xls 格式无流式接口，读取整个区域后取首行。
pub fn read_headers(path: &Path) -> ImportResult<Vec<String>> {
    if is_xlsx(path) {
        read_xlsx_headers(path)
    } else {
        let sheet = read_range(path)?;
        Ok(sheet.headers)
    }
}

fn read_xlsx_headers(path: &Path) -> ImportResult<Vec<String>> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e: calamine::XlsxError| ImportError::ExcelParseError(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

    let mut reader = workbook
        .worksheet_cells_reader(&sheet_name)
        .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

    // (列号, 文本)，列号为工作表中的绝对列号
    let mut cells: Vec<(u32, String)> = Vec::new();
    let mut header_row: Option<u32> = None;

    while let Some(cell) = reader
        .next_cell()
        .map_err(|e| ImportError::ExcelParseError(e.to_string()))?
    {
        let (row, col) = cell.get_position();
        let text = data_ref_text(cell.get_value());

        match header_row {
            None if text.trim().is_empty() => continue,
            None => header_row = Some(row),
            Some(first) if row != first => break,
            Some(_) => {}
        }
        cells.push((col, text));
    }

    let Some(first_col) = cells.iter().map(|(col, _)| *col).min() else {
        return Ok(Vec::new());
    };
    let last_col = cells.iter().map(|(col, _)| *col).max().unwrap_or(first_col);

    let headers = (first_col..=last_col)
        .enumerate()
        .map(|(idx, col)| {
            let raw = cells
                .iter()
                .find(|(c, _)| *c == col)
                .map(|(_, text)| text.as_str())
                .unwrap_or("");
            header_name(raw, idx)
        })
        .collect();

    Ok(headers)
}

/// 读取第一个工作表的全部数据
///
/// 整表一次性读入内存: 对 Excel 格式而言批量读取远快于逐行 I/O，
/// 代价是内存占用与文件大小成正比，对导入场景的文件规模可以接受。
/// 完全空白的行会被跳过。
pub fn read_sheet(path: &Path) -> ImportResult<SheetData> {
    let sheet = read_range(path)?;
    debug!(
        path = %path.display(),
        columns = sheet.headers.len(),
        rows = sheet.rows.len(),
        "工作表已读取"
    );
    Ok(sheet)
}

fn read_range(path: &Path) -> ImportResult<SheetData> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

    let range = workbook.worksheet_range(&sheet_name)?;
    let start_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(SheetData::default());
    };

    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| header_name(&data_text(cell), idx))
        .collect();

    let data_rows = rows
        .enumerate()
        .map(|(offset, cells)| ImportRow {
            // 表头位于 start_row（0 起），数据行从其下一行开始，行号按 1 起计
            row_number: start_row + offset + 2,
            cells: cells.iter().map(normalize_cell).collect(),
        })
        .filter(|row| !row.is_blank())
        .collect();

    Ok(SheetData {
        headers,
        rows: data_rows,
    })
}
