use std::fmt;

use bytes::{Buf, BufMut};

use crate::common::{
    Result, RowstoreError, COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE, EMAIL_SIZE, ROW_SIZE,
    USERNAME_SIZE,
};

/// A single fixed-width record: an integer key plus two bounded strings.
///
/// ## Row Binary Format
///
/// ```text
/// +-----------+--------------------+----------------------+
/// | id (u32)  | username           | email                |
/// | 4 bytes   | 33 bytes, 0-padded | 256 bytes, 0-padded  |
/// +-----------+--------------------+----------------------+
/// ```
///
/// The id is little-endian. No lengths or delimiters are stored; a string
/// ends at its first zero byte or at the end of its field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    id: u32,
    username: String,
    email: String,
}

impl Row {
    /// Builds a row, rejecting ids outside `0..=u32::MAX` and strings longer
    /// than their column.
    pub fn new(id: i64, username: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        if id < 0 {
            return Err(RowstoreError::NegativeId(id));
        }
        let id = u32::try_from(id).map_err(|_| RowstoreError::IdOutOfRange(id))?;

        let username = username.into();
        let email = email.into();
        check_len("username", &username, COLUMN_USERNAME_SIZE)?;
        check_len("email", &email, COLUMN_EMAIL_SIZE)?;

        Ok(Self {
            id,
            username,
            email,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Writes the row into the first `ROW_SIZE` bytes of `dst`.
    ///
    /// # Panics
    /// Panics if `dst` is shorter than `ROW_SIZE`.
    pub fn serialize(&self, dst: &mut [u8]) {
        let mut out = &mut dst[..ROW_SIZE];
        out.put_u32_le(self.id);
        put_padded(&mut out, self.username.as_bytes(), USERNAME_SIZE);
        put_padded(&mut out, self.email.as_bytes(), EMAIL_SIZE);
    }

    /// Returns the row's serialized form.
    pub fn to_bytes(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        self.serialize(&mut buf);
        buf
    }

    /// Reads a row back from the first `ROW_SIZE` bytes of `src`.
    ///
    /// # Panics
    /// Panics if `src` is shorter than `ROW_SIZE`.
    pub fn deserialize(src: &[u8]) -> Self {
        let mut input = &src[..ROW_SIZE];
        let id = input.get_u32_le();
        let username = take_padded(&mut input, USERNAME_SIZE);
        let email = take_padded(&mut input, EMAIL_SIZE);

        Self {
            id,
            username,
            email,
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(RowstoreError::StringTooLong {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

fn put_padded(out: &mut &mut [u8], value: &[u8], width: usize) {
    out.put_slice(value);
    out.put_bytes(0, width - value.len());
}

fn take_padded(input: &mut &[u8], width: usize) -> String {
    let field = &input[..width];
    let end = field.iter().position(|&b| b == 0).unwrap_or(width);
    let value = String::from_utf8_lossy(&field[..end]).into_owned();
    input.advance(width);
    value
}
