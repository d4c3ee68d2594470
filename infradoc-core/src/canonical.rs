//! Canonical document encoding: keys in declaration order, one tab per
//! indentation level, absent values as `null`, no trailing newline.

use std::io;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::DocumentError;

pub fn to_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, DocumentError> {
    let mut out = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut ser).map_err(io::Error::from)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        zeta: Option<String>,
        alpha: Vec<i64>,
        empty: Vec<i64>,
    }

    #[test]
    fn test_layout() {
        let bytes = to_bytes(&Sample {
            zeta: None,
            alpha: vec![1, 2],
            empty: vec![],
        })
        .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "{\n\t\"zeta\": null,\n\t\"alpha\": [\n\t\t1,\n\t\t2\n\t],\n\t\"empty\": []\n}"
        );
    }
}
