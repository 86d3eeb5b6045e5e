//! Label list codec
//!
//! Packs an ordered list of labels into one comma separated text field.
//! A label containing a comma or a double quote is wrapped in double quotes,
//! with inner quotes doubled. Labels must not contain newlines.
//!
//! The empty field decodes to a single empty label, so `[]` and `[""]` are
//! indistinguishable once stored. Readers may rely on either reading, so the
//! asymmetry is kept.

const DELIMITER: char = ',';
const QUOTE: char = '"';

pub fn encode<S: AsRef<str>>(labels: &[S]) -> String {
    labels
        .iter()
        .map(|label| encode_one(label.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

fn encode_one(label: &str) -> String {
    if label.contains(DELIMITER) || label.contains(QUOTE) {
        format!("\"{}\"", label.replace('"', "\"\""))
    } else {
        label.to_string()
    }
}

pub fn decode(field: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, ch) in field.char_indices() {
        match ch {
            QUOTE => in_quotes = !in_quotes,
            DELIMITER if !in_quotes => {
                segments.push(&field[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    segments.push(&field[start..]);

    segments.into_iter().map(unquote).collect()
}

fn unquote(segment: &str) -> String {
    let inner = if segment.len() >= 2 && segment.starts_with(QUOTE) && segment.ends_with(QUOTE) {
        &segment[1..segment.len() - 1]
    } else {
        segment
    };
    inner.replace("\"\"", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plain_labels_are_comma_joined() {
        assert_eq!(encode(&["INBOX", "UNREAD", "CATEGORY_SOCIAL"]), "INBOX,UNREAD,CATEGORY_SOCIAL");
        assert_eq!(decode("INBOX,UNREAD,CATEGORY_SOCIAL"), labels(&["INBOX", "UNREAD", "CATEGORY_SOCIAL"]));
    }

    #[test]
    fn test_quoting_of_delimiters_and_quotes() {
        let encoded = encode(&["a,b", "c\"d"]);
        assert_eq!(encoded, "\"a,b\",\"c\"\"d\"");
        assert_eq!(decode(&encoded), labels(&["a,b", "c\"d"]));
    }

    #[test]
    fn test_round_trip_edge_cases() {
        let cases: Vec<Vec<String>> = vec![
            labels(&["only"]),
            labels(&["", "x"]),
            labels(&["x", ""]),
            labels(&["\""]),
            labels(&["\"\""]),
            labels(&[",", ",,", "\",\""]),
            labels(&["  padded  ", "ünïcødé, too", "Label_42"]),
            labels(&["\"leading", "trailing\"", "mid\"dle"]),
        ];

        for case in cases {
            assert_eq!(decode(&encode(&case)), case, "round trip of {:?}", case);
        }
    }

    #[test]
    fn test_empty_list_and_empty_field() {
        let empty: [&str; 0] = [];
        assert_eq!(encode(&empty), "");
        // Documented asymmetry: the empty field is one empty label
        assert_eq!(decode(""), labels(&[""]));
    }

    #[test]
    fn test_unterminated_quote_is_kept_literally() {
        assert_eq!(decode("\"abc"), labels(&["\"abc"]));
        assert_eq!(decode("\"a,b"), labels(&["\"a,b"]));
    }
}
