//! Row codec (§4.1): fixed-width serialization of a row record to and from
//! a raw byte slice. A memcpy-equivalent against the field offsets below —
//! no validation happens here. Oversized strings are rejected by the
//! statement preparer (`repl::parser`) before a `Row` is ever constructed.

/// Logical max length of `username`, not counting the terminator.
pub const COLUMN_USERNAME_SIZE: usize = 32;
/// Logical max length of `email`, not counting the terminator.
pub const COLUMN_EMAIL_SIZE: usize = 255;

/// On-disk field width of `username` (32 bytes + null terminator).
pub const USERNAME_SIZE: usize = COLUMN_USERNAME_SIZE + 1;
/// On-disk field width of `email` (255 bytes + null terminator).
pub const EMAIL_SIZE: usize = COLUMN_EMAIL_SIZE + 1;

const ID_SIZE: usize = std::mem::size_of::<u32>();

const ID_OFFSET: usize = 0;
const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// Serialized width of a row: 4 + 33 + 256 = 293 bytes.
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// A single row: an `id` primary key plus two fixed, null-terminated
/// string fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    username: [u8; USERNAME_SIZE],
    email: [u8; EMAIL_SIZE],
}

impl Row {
    /// Builds a row from an id and two strings, truncating to the logical
    /// maxima. Callers that must reject oversized input (the REPL's
    /// statement preparer) are expected to check lengths themselves first;
    /// this constructor silently truncates rather than erroring, matching
    /// the codec's "assume pre-validated input" contract.
    pub fn new(id: u32, username: &str, email: &str) -> Self {
        Row {
            id,
            username: str_to_field(username),
            email: str_to_field(email),
        }
    }

    pub fn username(&self) -> &str {
        field_to_str(&self.username)
    }

    pub fn email(&self) -> &str {
        field_to_str(&self.email)
    }

    /// Bit-exact memcpy into `dst`, which must be at least `ROW_SIZE` bytes.
    pub fn serialize(&self, dst: &mut [u8]) {
        dst[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        dst[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE].copy_from_slice(&self.username);
        dst[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE].copy_from_slice(&self.email);
    }

    /// Bit-exact memcpy out of `src`, which must be at least `ROW_SIZE`
    /// bytes.
    pub fn deserialize(src: &[u8]) -> Self {
        let mut id_bytes = [0u8; ID_SIZE];
        id_bytes.copy_from_slice(&src[ID_OFFSET..ID_OFFSET + ID_SIZE]);

        let mut username = [0u8; USERNAME_SIZE];
        username.copy_from_slice(&src[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]);

        let mut email = [0u8; EMAIL_SIZE];
        email.copy_from_slice(&src[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]);

        Row {
            id: u32::from_le_bytes(id_bytes),
            username,
            email,
        }
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username(), self.email())
    }
}

fn str_to_field<const N: usize>(s: &str) -> [u8; N] {
    let mut buf = [0u8; N];
    let bytes = s.as_bytes();
    let len = bytes.len().min(N - 1); // always leave room for the terminator
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

fn field_to_str(field: &[u8]) -> &str {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_size_is_293_bytes() {
        assert_eq!(ROW_SIZE, 293);
    }

    #[test]
    fn round_trip_preserves_fields() {
        let row = Row::new(7, "alice", "alice@example.com");
        let mut buf = [0u8; ROW_SIZE];
        row.serialize(&mut buf);
        let back = Row::deserialize(&buf);
        assert_eq!(back, row);
        assert_eq!(back.username(), "alice");
        assert_eq!(back.email(), "alice@example.com");
    }

    #[test]
    fn strings_are_null_terminated_on_disk() {
        let row = Row::new(1, "bob", "b@x");
        let mut buf = [0u8; ROW_SIZE];
        row.serialize(&mut buf);
        assert_eq!(buf[USERNAME_OFFSET + 3], 0);
        assert_eq!(buf[EMAIL_OFFSET + 3], 0);
    }

    #[test]
    fn empty_strings_round_trip() {
        let row = Row::new(0, "", "");
        let mut buf = [0u8; ROW_SIZE];
        row.serialize(&mut buf);
        let back = Row::deserialize(&buf);
        assert_eq!(back.username(), "");
        assert_eq!(back.email(), "");
    }
}
