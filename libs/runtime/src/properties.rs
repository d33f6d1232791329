//! Flat `key=value` property files in the Java `.properties` format.
//!
//! Separators are `=`, `:` or whitespace; `#` and `!` start comments; a
//! trailing backslash joins the next line; `\\`, `\=`, `\:` and `\uXXXX`
//! escapes are decoded. Files are read as UTF-8 and values are trimmed.
//! Later keys replace earlier ones.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use java_properties::{PropertiesError, PropertiesIter};

pub fn load(path: &Path) -> io::Result<HashMap<String, String>> {
    let file = File::open(path)?;
    read(BufReader::new(file)).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

pub fn read<R: Read>(input: R) -> Result<HashMap<String, String>, PropertiesError> {
    let mut out = HashMap::new();
    PropertiesIter::new_with_encoding(input, encoding_rs::UTF_8).read_into(|k, v| {
        out.insert(k.trim().to_string(), v.trim().to_string());
    })?;
    Ok(out)
}

pub fn parse(raw: &str) -> Result<HashMap<String, String>, PropertiesError> {
    read(raw.as_bytes())
}
