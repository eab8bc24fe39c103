use std::error::Error;

pub type CliResult<T> = Result<T, Box<dyn Error>>;

pub fn map_query_error(err: xqtype::Error) -> Box<dyn Error> {
    Box::new(err)
}

/// Parse `--namespace prefix=uri` values.
pub fn parse_namespace_bindings(values: &[String]) -> CliResult<Vec<(String, String)>> {
    values
        .iter()
        .map(|value| match value.split_once('=') {
            Some((prefix, uri)) if !prefix.is_empty() => Ok((prefix.to_owned(), uri.to_owned())),
            _ => Err(format!("invalid namespace binding: {value} (expected PREFIX=URI)").into()),
        })
        .collect()
}
