/// Separator between a source alias and a field name
pub const ALIAS_SEPARATOR: char = '.';

/// Qualified column name type (`"<alias>.<field>"`)
pub type QualifiedName = String;

/// Qualify a column with an alias unless it already carries that alias.
pub fn qualify(alias: &str, column: &str) -> QualifiedName {
    let prefix_len = alias.len() + ALIAS_SEPARATOR.len_utf8();
    if let (Some(head), Some(rest)) = (column.get(..alias.len()), column.get(alias.len()..)) {
        if column.len() > prefix_len
            && head.eq_ignore_ascii_case(alias)
            && rest.starts_with(ALIAS_SEPARATOR)
        {
            return column.to_string();
        }
    }
    format!("{}{}{}", alias, ALIAS_SEPARATOR, column)
}

/// Qualify with an optional scope alias. Without a scope the name is kept as given.
pub fn qualify_in_scope(scope: Option<&str>, column: &str) -> QualifiedName {
    match scope {
        Some(alias) => qualify(alias, column),
        None => column.to_string(),
    }
}

/// Split `alias.field` at the first separator.
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    name.split_once(ALIAS_SEPARATOR)
}

/// Field part of a qualified name (everything after the first separator).
pub fn field_suffix(name: &str) -> Option<&str> {
    split_qualified(name).map(|(_, field)| field)
}
