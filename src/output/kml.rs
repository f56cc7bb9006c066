//! KML export of stored venues

use super::OutputResult;
use crate::storage::{Storage, VenueRecord};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const KML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<kml xmlns=\"http://www.opengis.net/kml/2.2\">\n<Folder>\n";

const KML_FOOTER: &str = "</Folder>\n</kml>\n";

/// Writes every located venue in the store to `output_path`
///
/// # Returns
///
/// The number of placemarks written
pub fn export_kml(storage: &dyn Storage, output_path: &Path) -> OutputResult<usize> {
    let venues = storage.all_venues()?;
    let (document, written) = format_kml(&venues);

    let mut file = BufWriter::new(File::create(output_path)?);
    file.write_all(document.as_bytes())?;
    file.flush()?;

    tracing::info!("wrote {} placemarks to {}", written, output_path.display());
    Ok(written)
}

/// Formats venues as a KML document, skipping those without a location
pub fn format_kml(venues: &[VenueRecord]) -> (String, usize) {
    let mut kml = String::from(KML_HEADER);
    let mut written = 0;

    for venue in venues {
        let Some(location) = venue.location else {
            continue;
        };
        kml.push_str("<Placemark>\n");
        kml.push_str(&format!(
            "  <description>{}</description>\n",
            xml_escape(&venue.name)
        ));
        kml.push_str(&format!(
            "  <Point><coordinates>{:.8},{:.8}</coordinates></Point>\n",
            location.lng(),
            location.lat()
        ));
        kml.push_str("</Placemark>\n");
        written += 1;
    }

    kml.push_str(KML_FOOTER);
    (kml, written)
}

/// Escapes the five XML special characters
pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
