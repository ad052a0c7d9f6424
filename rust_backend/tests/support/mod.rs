#![allow(dead_code)]

use mixvol::parsing::{Cell, RawTable};
use rust_xlsxwriter::Workbook;

pub const HEADERS: [&str; 4] = ["Sample", "Bitumen Content (%)", "Gmb", "Gmm"];

/// Five trial mixes spanning 4.5-6.5 % bitumen, deliberately out of order.
pub const SAMPLES: [(&str, f64, f64, f64); 5] = [
    ("M3", 5.5, 2.381, 2.421),
    ("M1", 4.5, 2.350, 2.450),
    ("M5", 6.5, 2.372, 2.390),
    ("M2", 5.0, 2.366, 2.437),
    ("M4", 6.0, 2.384, 2.405),
];

pub const GB: f64 = 1.03;
pub const GSB: f64 = 2.60;

pub fn sample_table() -> RawTable {
    let rows = SAMPLES
        .iter()
        .map(|(id, pb, gmb, gmm)| {
            vec![
                Cell::Text(id.to_string()),
                Cell::Number(*pb),
                Cell::Number(*gmb),
                Cell::Number(*gmm),
            ]
        })
        .collect();
    RawTable::from_rows(&HEADERS, rows)
}

/// The sample table as an xlsx upload with one sheet named `Lab Data`.
pub fn sample_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Lab Data").unwrap();

    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (i, (id, pb, gmb, gmm)) in SAMPLES.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, *id).unwrap();
        sheet.write_number(row, 1, *pb).unwrap();
        sheet.write_number(row, 2, *gmb).unwrap();
        sheet.write_number(row, 3, *gmm).unwrap();
    }

    workbook.save_to_buffer().unwrap()
}

pub fn sample_csv() -> String {
    let mut csv = HEADERS.join(",");
    csv.push('\n');
    for (id, pb, gmb, gmm) in SAMPLES {
        csv.push_str(&format!("{},{},{},{}\n", id, pb, gmb, gmm));
    }
    csv
}

/// `true` when the xlsx zip container holds an entry with this name.
///
/// Zip local headers store entry names uncompressed.
pub fn has_zip_entry(bytes: &[u8], name: &str) -> bool {
    bytes
        .windows(name.len())
        .any(|window| window == name.as_bytes())
}
