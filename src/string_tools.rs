pub fn ensure_pascal_case(str: &mut String) {
    if let Some(c) = str.get_mut(0..1) {
        c.make_ascii_uppercase();
    }
}

pub fn pascal_case(value: &str) -> String {
    let mut owned = value.to_owned();
    ensure_pascal_case(&mut owned);
    owned
}

/// Splits a dotted identifier such as `Audio.Details.Album` into its segments.
pub fn split_identifier(identifier: &str) -> Vec<&str> {
    identifier.split('.').collect()
}
