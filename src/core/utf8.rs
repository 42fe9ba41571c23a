//! Repair of invalid UTF-8 in decoded output.

/// The UTF-8 encoding of U+FFFD REPLACEMENT CHARACTER.
pub const REPLACEMENT_CHARACTER: &[u8] = "\u{FFFD}".as_bytes();

/// Replace every maximal run of invalid UTF-8 bytes with one `replacement`.
///
/// Valid sequences are copied untouched. Consecutive invalid sequences, even
/// when UTF-8 would report them as separate errors, collapse into a single
/// replacement, so the output can be shorter than the input.
pub fn replace_invalid_utf8(bytes: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut in_invalid_run = false;

    for chunk in bytes.utf8_chunks() {
        let valid = chunk.valid();
        if !valid.is_empty() {
            out.extend_from_slice(valid.as_bytes());
            in_invalid_run = false;
        }
        if !chunk.invalid().is_empty() {
            if !in_invalid_run {
                out.extend_from_slice(replacement);
            }
            in_invalid_run = true;
        }
    }

    out
}

/// Length of the prefix of `bytes` that ends on a complete valid character.
///
/// Everything after it is either invalid or an unfinished sequence that may
/// still become valid once more bytes arrive.
pub(crate) fn settled_len(bytes: &[u8]) -> usize {
    let mut offset = 0;
    let mut settled = 0;
    for chunk in bytes.utf8_chunks() {
        offset += chunk.valid().len();
        if !chunk.valid().is_empty() {
            settled = offset;
        }
        offset += chunk.invalid().len();
    }
    settled
}

/// Read `bytes` as text, each invalid byte becoming one U+FFFD.
///
/// Returns the text and, for every byte of it plus one past the end, the
/// offset in `bytes` it came from. The three bytes of a substituted U+FFFD all
/// map to the offset of the invalid byte.
pub(crate) fn scalar_view(bytes: &[u8]) -> (String, Vec<usize>) {
    let mut text = String::with_capacity(bytes.len() + 8);
    let mut offsets = Vec::with_capacity(bytes.len() + 9);
    let mut pos = 0;

    for chunk in bytes.utf8_chunks() {
        let valid = chunk.valid();
        text.push_str(valid);
        offsets.extend(pos..pos + valid.len());
        pos += valid.len();

        for _ in chunk.invalid() {
            text.push(char::REPLACEMENT_CHARACTER);
            offsets.extend([pos; 3]);
            pos += 1;
        }
    }
    offsets.push(pos);

    (text, offsets)
}
