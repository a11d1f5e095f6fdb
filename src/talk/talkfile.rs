//! Talk file codec
//!
//! Layout: 2-byte version, 1-byte statement count, then per statement four
//! u16-length-prefixed strings (prompt, reply, link file, voice clip), the
//! required and modified flag counts, the i16 flag ids, a portrait side byte
//! and a u16 quotient. All integers are little-endian.

use super::statement::Statement;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TalkFileError {
    #[error("Unexpected end of data reading {field} at offset {offset}")]
    UnexpectedEof { field: &'static str, offset: usize },

    #[error("{0} statements do not fit in a talk file")]
    TooManyStatements(usize),

    #[error("Field {field} of statement {statement} is too long ({len} bytes)")]
    FieldTooLong {
        field: &'static str,
        statement: usize,
        len: usize,
    },
}

/// A parsed talk file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TalkFile {
    /// Version bytes, kept for re-serialization
    pub version: [u8; 2],
    pub statements: Vec<Statement>,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], TalkFileError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or(TalkFileError::UnexpectedEof {
                field,
                offset: self.pos,
            })?;
        self.pos += n;
        Ok(bytes)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, TalkFileError> {
        Ok(self.take(1, field)?[0])
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, TalkFileError> {
        let b = self.take(2, field)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn string(&mut self, field: &'static str) -> Result<Vec<u8>, TalkFileError> {
        let len = self.u16(field)? as usize;
        Ok(self.take(len, field)?.to_vec())
    }

    fn flags(&mut self, count: u8, field: &'static str) -> Result<Vec<i16>, TalkFileError> {
        (0..count)
            .map(|_| self.u16(field).map(|v| v as i16))
            .collect()
    }
}

impl TalkFile {
    pub fn parse(data: &[u8]) -> Result<Self, TalkFileError> {
        let mut r = Reader { data, pos: 0 };
        let v = r.take(2, "version")?;
        let version = [v[0], v[1]];
        let count = r.u8("statement count")?;

        let mut statements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let prompt = r.string("prompt")?;
            let reply = r.string("reply")?;
            let link = r.string("link file")?;
            let voice = r.string("voice file")?;
            let required_count = r.u8("required count")?;
            let modified_count = r.u8("modified count")?;
            let required = r.flags(required_count, "required flags")?;
            let modified = r.flags(modified_count, "modified flags")?;
            let portrait_side = r.u8("portrait side")?;
            let quotient = r.u16("quotient")?;

            statements.push(Statement {
                prompt,
                reply,
                link,
                voice,
                required,
                modified,
                portrait_side,
                quotient,
                talk_map: -1,
            });
        }

        if r.pos < data.len() {
            log::debug!("Talk file has {} trailing bytes", data.len() - r.pos);
        }
        Ok(TalkFile {
            version,
            statements,
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>, TalkFileError> {
        if self.statements.len() > u8::MAX as usize {
            return Err(TalkFileError::TooManyStatements(self.statements.len()));
        }

        let mut out = Vec::new();
        out.extend_from_slice(&self.version);
        out.push(self.statements.len() as u8);

        for (i, s) in self.statements.iter().enumerate() {
            for (field, bytes) in [
                ("prompt", &s.prompt),
                ("reply", &s.reply),
                ("link file", &s.link),
                ("voice file", &s.voice),
            ] {
                let len = u16::try_from(bytes.len()).map_err(|_| TalkFileError::FieldTooLong {
                    field,
                    statement: i,
                    len: bytes.len(),
                })?;
                out.extend_from_slice(&len.to_le_bytes());
                out.extend_from_slice(bytes);
            }

            for (field, flags) in [("required flags", &s.required), ("modified flags", &s.modified)] {
                if flags.len() > u8::MAX as usize {
                    return Err(TalkFileError::FieldTooLong {
                        field,
                        statement: i,
                        len: flags.len(),
                    });
                }
            }
            out.push(s.required.len() as u8);
            out.push(s.modified.len() as u8);
            for f in s.required.iter().chain(&s.modified) {
                out.extend_from_slice(&f.to_le_bytes());
            }
            out.push(s.portrait_side);
            out.extend_from_slice(&s.quotient.to_le_bytes());
        }
        Ok(out)
    }
}
