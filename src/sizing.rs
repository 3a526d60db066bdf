//! Column auto-sizing from header labels and loaded values.

use crate::column::Column;
use crate::page::DataPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingOptions {
    pub min_width: u16,
    pub max_width: Option<u16>,
}

impl Default for SizingOptions {
    fn default() -> Self {
        Self {
            min_width: 3,
            max_width: Some(40),
        }
    }
}

fn text_width(s: &str) -> u16 {
    s.chars().count().min(u16::MAX as usize) as u16
}

/// (header width, widest loaded value) for `column`.
pub fn natural_widths(column: &Column, page: &DataPage) -> (u16, u16) {
    let header = text_width(&column.name);
    let data = page
        .records()
        .filter_map(|(_, record)| record.get(&column.name))
        .map(|cell| text_width(&cell.view))
        .max()
        .unwrap_or(0);
    (header, data)
}

/// Size `column` to fit its header and loaded values, capped at the maximum.
/// Hitting the cap marks the column resized and keeps both natural widths.
pub fn auto_size(column: &mut Column, page: &DataPage, options: SizingOptions) {
    let (header, data) = natural_widths(column, page);
    let natural = header.max(data).max(options.min_width);
    match options.max_width {
        Some(max) if natural > max => {
            column.width = max.max(options.min_width);
            column.resized = true;
            column.data_width = data;
            column.header_width = header;
        }
        _ => {
            column.width = natural;
            column.resized = false;
            column.data_width = 0;
            column.header_width = 0;
        }
    }
}

/// Auto-size every column whose width was not set by hand.
pub fn auto_size_all(columns: &mut [Column], page: &DataPage, options: SizingOptions) {
    for column in columns.iter_mut().filter(|c| !c.manual_width) {
        auto_size(column, page, options);
    }
}

/// Width of all visible columns including the gap between them.
pub fn total_visible_width(columns: &[Column], padding: u16) -> u32 {
    columns
        .iter()
        .filter(|c| c.visible)
        .map(|c| c.width as u32 + padding as u32)
        .sum()
}
