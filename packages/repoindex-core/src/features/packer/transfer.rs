//! The v1 transfer stream: the published `.gz` snapshot and chunk
//! format.
//!
//! Layout (inside the gzip stream, all integers LEB128 varints unless
//! noted):
//!
//! ```text
//! [magic 4B "NIX1"][version u8][timestamp-millis u64 BE][doc-count]
//! [document]*
//!
//! document := [field-count] ([key-len][key][flags u8][value-len][value])*
//! ```
//!
//! Field flags: bit 0 indexed, bit 1 tokenized, bit 2 stored. Keys and
//! values are UTF-8. The format is bit-stable: peers replay these
//! streams into their own indexes.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tantivy::schema::Value;
use tantivy::TantivyDocument;

use crate::errors::{IndexError, Result};
use crate::features::schema::fields::ALL_FIELDS;
use crate::features::schema::SchemaFields;

pub const MAGIC: [u8; 4] = *b"NIX1";
pub const FORMAT_VERSION: u8 = 1;

pub const FLAG_INDEXED: u8 = 0x01;
pub const FLAG_TOKENIZED: u8 = 0x02;
pub const FLAG_STORED: u8 = 0x04;

/// One field of a transfer document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferField {
    pub key: String,
    pub flags: u8,
    pub value: String,
}

/// One document of a transfer stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferDocument {
    pub fields: Vec<TransferField>,
}

impl TransferDocument {
    /// Flatten a stored index document into transfer fields, using the
    /// registry for flags. Multi-valued fields contribute one transfer
    /// field per value.
    pub fn from_document(doc: &TantivyDocument, fields: &SchemaFields) -> TransferDocument {
        let mut out = TransferDocument::default();
        for field in ALL_FIELDS {
            let mut flags = 0u8;
            if field.indexed {
                flags |= FLAG_INDEXED;
                if !field.keyword {
                    flags |= FLAG_TOKENIZED;
                }
            }
            if field.stored {
                flags |= FLAG_STORED;
            }
            for value in doc.get_all(fields.of(field)) {
                if let Some(text) = value.as_str() {
                    out.fields.push(TransferField {
                        key: field.key.to_string(),
                        flags,
                        value: text.to_string(),
                    });
                }
            }
        }
        out
    }

    /// Rebuild an index document. Unknown keys are skipped for forward
    /// compatibility.
    pub fn to_document(&self, fields: &SchemaFields) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        for field in &self.fields {
            if let Ok(handle) = fields.schema.get_field(&field.key) {
                doc.add_text(handle, &field.value);
            }
        }
        doc
    }

    /// The first value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }
}

/// Writes one transfer stream. The document count is part of the
/// header, so the caller supplies it up front.
pub struct ChunkWriter<W: Write> {
    inner: GzEncoder<W>,
    declared: u64,
    written: u64,
}

impl<W: Write> ChunkWriter<W> {
    pub fn new(target: W, timestamp_millis: u64, doc_count: u64) -> Result<ChunkWriter<W>> {
        let mut inner = GzEncoder::new(target, Compression::default());
        inner.write_all(&MAGIC)?;
        inner.write_all(&[FORMAT_VERSION])?;
        inner.write_all(&timestamp_millis.to_be_bytes())?;
        write_varint(&mut inner, doc_count)?;
        Ok(ChunkWriter {
            inner,
            declared: doc_count,
            written: 0,
        })
    }

    pub fn write_document(&mut self, doc: &TransferDocument) -> Result<()> {
        write_varint(&mut self.inner, doc.fields.len() as u64)?;
        for field in &doc.fields {
            write_varint(&mut self.inner, field.key.len() as u64)?;
            self.inner.write_all(field.key.as_bytes())?;
            self.inner.write_all(&[field.flags])?;
            write_varint(&mut self.inner, field.value.len() as u64)?;
            self.inner.write_all(field.value.as_bytes())?;
        }
        self.written += 1;
        Ok(())
    }

    pub fn finish(self) -> Result<W> {
        if self.written != self.declared {
            return Err(IndexError::corrupt(format!(
                "declared {} documents, wrote {}",
                self.declared, self.written
            )));
        }
        Ok(self.inner.finish()?)
    }
}

/// Reads one transfer stream.
pub struct ChunkReader<R: Read> {
    inner: GzDecoder<R>,
    pub timestamp_millis: u64,
    remaining: u64,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(source: R) -> Result<ChunkReader<R>> {
        let mut inner = GzDecoder::new(source);

        let mut magic = [0u8; 4];
        inner.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(IndexError::corrupt("bad transfer stream magic"));
        }
        let mut version = [0u8; 1];
        inner.read_exact(&mut version)?;
        if version[0] != FORMAT_VERSION {
            return Err(IndexError::corrupt(format!(
                "unsupported transfer stream version {}",
                version[0]
            )));
        }
        let mut millis = [0u8; 8];
        inner.read_exact(&mut millis)?;
        let timestamp_millis = u64::from_be_bytes(millis);
        let remaining = read_varint(&mut inner)?;

        Ok(ChunkReader {
            inner,
            timestamp_millis,
            remaining,
        })
    }

    pub fn doc_count(&self) -> u64 {
        self.remaining
    }

    pub fn next_document(&mut self) -> Result<Option<TransferDocument>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;

        let field_count = read_varint(&mut self.inner)?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let key = read_string(&mut self.inner)?;
            let mut flags = [0u8; 1];
            self.inner.read_exact(&mut flags)?;
            let value = read_string(&mut self.inner)?;
            fields.push(TransferField {
                key,
                flags: flags[0],
                value,
            });
        }
        Ok(Some(TransferDocument { fields }))
    }

    /// Drain the stream into a vector.
    pub fn read_all(mut self) -> Result<Vec<TransferDocument>> {
        let mut docs = Vec::with_capacity(self.remaining as usize);
        while let Some(doc) = self.next_document()? {
            docs.push(doc);
        }
        Ok(docs)
    }
}

fn write_varint<W: Write>(w: &mut W, mut value: u64) -> Result<()> {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        w.write_all(&[byte])?;
        if value == 0 {
            return Ok(());
        }
    }
}

fn read_varint<R: Read>(r: &mut R) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let mut byte = [0u8; 1];
        r.read_exact(&mut byte)?;
        value |= u64::from(byte[0] & 0x7f) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= 64 {
            return Err(IndexError::corrupt("varint overflow"));
        }
    }
}

fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = read_varint(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| IndexError::corrupt("invalid UTF-8 in transfer stream"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::creator::{build_document, default_creators};
    use crate::shared::models::ArtifactInfo;

    fn sample_docs() -> Vec<TransferDocument> {
        let fields = SchemaFields::build();
        let creators = default_creators();

        let mut a = ArtifactInfo::new("org.example", "app", "1.0");
        a.extension = "jar".to_string();
        a.packaging = "jar".to_string();
        a.class_names = vec!["/org/example/App".to_string(), "/org/example/Cli".to_string()];

        let mut b = ArtifactInfo::new("org.example", "lib", "2.0");
        b.extension = "jar".to_string();
        b.packaging = "jar".to_string();

        vec![
            TransferDocument::from_document(&build_document(&a, &fields, &creators), &fields),
            TransferDocument::from_document(&build_document(&b, &fields, &creators), &fields),
        ]
    }

    #[test]
    fn test_stream_round_trip() {
        let docs = sample_docs();

        let mut writer = ChunkWriter::new(Vec::new(), 1_700_000_000_000, docs.len() as u64).unwrap();
        for doc in &docs {
            writer.write_document(doc).unwrap();
        }
        let bytes = writer.finish().unwrap();

        let reader = ChunkReader::new(bytes.as_slice()).unwrap();
        assert_eq!(reader.timestamp_millis, 1_700_000_000_000);
        assert_eq!(reader.doc_count(), 2);
        let back = reader.read_all().unwrap();
        assert_eq!(back, docs);
    }

    #[test]
    fn test_multi_valued_fields_survive() {
        let docs = sample_docs();
        let kw_values: Vec<_> = docs[0]
            .fields
            .iter()
            .filter(|f| f.key == "classnames_kw")
            .map(|f| f.value.as_str())
            .collect();
        assert_eq!(kw_values, vec!["/org/example/App", "/org/example/Cli"]);

        // And back into a document with both values.
        let fields = SchemaFields::build();
        let doc = docs[0].to_document(&fields);
        let restored: Vec<_> = doc
            .get_all(fields.field("classnames_kw"))
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(restored, vec!["/org/example/App", "/org/example/Cli"]);
    }

    #[test]
    fn test_count_mismatch_is_error() {
        let writer = ChunkWriter::new(Vec::new(), 0, 3).unwrap();
        assert!(writer.finish().is_err());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"NOPE").unwrap();
        encoder.write_all(&[0u8; 16]).unwrap();
        let bytes = encoder.finish().unwrap();
        assert!(ChunkReader::new(bytes.as_slice()).is_err());
    }

    #[test]
    fn test_varint_round_trip() {
        for value in [0u64, 1, 127, 128, 300, 16_383, 16_384, u64::MAX] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value).unwrap();
            assert_eq!(read_varint(&mut buf.as_slice()).unwrap(), value);
        }
    }
}
