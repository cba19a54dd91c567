//! Cálculo de hashes para identificar archivos pequeños.

use md5::Md5;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const HASH_SIZE_LIMIT: u64 = 32 * 1024 * 1024; // 32 MiB

#[derive(Clone, Debug)]
pub struct HashSummary {
    pub md5: String,
    pub sha256: String,
}

impl HashSummary {
    fn repeated(value: String) -> Self {
        Self {
            md5: value.clone(),
            sha256: value,
        }
    }
}

/// Devuelve los hashes del archivo o un mensaje cuando no aplica.
pub fn file_hashes(path: &Path, size: u64) -> HashSummary {
    if size > HASH_SIZE_LIMIT {
        return HashSummary::repeated(format!(
            "Skipped (> {} MiB)",
            HASH_SIZE_LIMIT / (1024 * 1024)
        ));
    }

    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(error) => return HashSummary::repeated(format!("Unavailable ({error})")),
    };

    let mut md5 = Md5::new();
    let mut sha256 = Sha256::new();
    let mut buffer = [0_u8; 8192];
    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(bytes_read) => {
                md5.update(&buffer[..bytes_read]);
                sha256.update(&buffer[..bytes_read]);
            }
            Err(error) => return HashSummary::repeated(format!("Unavailable ({error})")),
        }
    }

    HashSummary {
        md5: format!("{:x}", md5.finalize()),
        sha256: format!("{:x}", sha256.finalize()),
    }
}
