use anyhow::{Context, Result};
use rand::Rng;
use rust_xlsxwriter::Workbook;
use std::path::Path;

use crate::models::ListingRecord;

pub const COLUMNS: [&str; 4] = ["Product Link", "Listing Title", "Listing URL", "Price"];

/// Append-only spreadsheet sink. Rows land in discovery order below the
/// header; nothing is ever read back or rewritten.
pub struct ListingSheet {
    workbook: Workbook,
    next_row: u32,
}

impl ListingSheet {
    pub fn new() -> Result<Self> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_column_width(0, 10)?;
        sheet.set_column_width(1, 50)?;
        sheet.set_column_width(2, 10)?;
        sheet.set_column_width(3, 10)?;
        for (col, header) in COLUMNS.iter().enumerate() {
            sheet.write_string(0, col as u16, *header)?;
        }
        Ok(Self {
            workbook,
            next_row: 1,
        })
    }

    /// Write one record, returning the row index it landed on.
    pub fn append(&mut self, record: &ListingRecord) -> Result<u32> {
        let sheet = self.workbook.worksheet_from_index(0)?;
        sheet.write_string(self.next_row, 0, record.product_page_url.as_str())?;
        sheet.write_string(self.next_row, 1, record.title.as_str())?;
        sheet.write_string(self.next_row, 2, record.listing_url.as_str())?;
        sheet.write_string(self.next_row, 3, record.price.as_str())?;
        let row = self.next_row;
        self.next_row += 1;
        Ok(row)
    }

    pub fn save(mut self, path: &Path) -> Result<()> {
        self.workbook
            .save(path)
            .with_context(|| format!("failed to save spreadsheet to {}", path.display()))
    }
}

/// `output_<suffix>.xlsx`, randomized so repeated runs never collide.
pub fn output_filename() -> String {
    format!("output_{}.xlsx", random_suffix(6))
}

fn random_suffix(length: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: u32) -> ListingRecord {
        ListingRecord {
            product_page_url: format!("https://www.tcgplayer.com/product/{}", n),
            title: format!("Signed card {}", n),
            listing_url: format!("https://www.tcgplayer.com/product/{}?listing={}", n, n),
            price: "$1.23".to_string(),
        }
    }

    #[test]
    fn rows_are_appended_in_order() {
        let mut sheet = ListingSheet::new().unwrap();
        assert_eq!(sheet.append(&record(1)).unwrap(), 1);
        assert_eq!(sheet.append(&record(2)).unwrap(), 2);
        assert_eq!(sheet.append(&record(3)).unwrap(), 3);
    }

    #[test]
    fn suffix_uses_lowercase_alphanumerics() {
        let suffix = random_suffix(6);
        assert_eq!(suffix.len(), 6);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn filename_shape() {
        let name = output_filename();
        assert!(name.starts_with("output_"));
        assert!(name.ends_with(".xlsx"));
    }
}
