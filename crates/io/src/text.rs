use std::io::Read;
use std::path::Path;

use drivercore_recon::IngestError;

/// Read a file as text, decoding as Windows-1252 when it is not UTF-8.
///
/// Vendor CSVs are usually exported from Excel. A leading byte-order mark
/// is dropped.
pub fn read_file_as_utf8(path: &Path) -> Result<String, IngestError> {
    let io_err = |e: std::io::Error| IngestError::Source(format!("cannot read {}: {e}", path.display()));

    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            log::debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "Acer,Aspire,Café\n").unwrap();
        assert_eq!(read_file_as_utf8(&path).unwrap(), "Acer,Aspire,Café\n");
    }

    #[test]
    fn windows_1252_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        // "Café" with é as 0xE9
        std::fs::write(&path, b"Acer,Aspire,Caf\xe9\n").unwrap();
        assert_eq!(read_file_as_utf8(&path).unwrap(), "Acer,Aspire,Café\n");
    }

    #[test]
    fn bom_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "\u{feff}Make,Model\n").unwrap();
        assert_eq!(read_file_as_utf8(&path).unwrap(), "Make,Model\n");
    }
}
