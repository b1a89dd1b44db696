//! Interface records stored as element fields.
//!
//! A recorded sub-network interface keeps two fields: `nodeCount`, the number
//! of numbered nodes the sub-network had, and `connections`, one entry per
//! link port bound to a keyed interface node:
//!
//! ```text
//! R1,0,inlet,3 -1;P2,1,outlet,0 4
//! ```
//!
//! Each entry is `link,port,key,port map`, where the port map lists the
//! link's resolved node numbers separated by spaces (`-1` for Ground).

use winnow::{
    Parser as _,
    ascii::{digit1, space0, space1},
    combinator::{delimited, opt, separated, terminated},
    error::{ContextError, ErrMode},
    token::take_while,
};

use netweave_core::element::{Connection, InterfaceRecord};

type PResult<O> = Result<O, ErrMode<ContextError>>;

/// Field holding the recorded node count of an interface.
pub const NODE_COUNT_FIELD: &str = "nodeCount";
/// Field holding the recorded connections of an interface.
pub const CONNECTIONS_FIELD: &str = "connections";

/// Fields of a super-port element.
pub const INSTANCE_FIELD: &str = "instance";
pub const LINK_FIELD: &str = "link";
pub const PORT_FIELD: &str = "port";
pub const NODE_FIELD: &str = "node";

/// Parse a `connections` field value.
///
/// # Errors
///
/// Returns a message naming the byte offset where parsing stopped.
pub fn parse_connections(text: &str) -> Result<Vec<Connection>, String> {
    connections
        .parse(text.trim())
        .map_err(|err| format!("unexpected input at offset {}", err.offset()))
}

/// Parse a `nodeCount` field value.
///
/// # Errors
///
/// Returns a message if the value is not a non-negative integer.
pub fn parse_node_count(text: &str) -> Result<usize, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("`{text}` is not a node count"))
}

/// Read an interface record from its two field values.
///
/// A missing `nodeCount` means the interface was never recorded.
///
/// # Errors
///
/// Returns the name of the bad field and a message.
pub fn parse_interface_record(
    node_count: Option<&str>,
    connections: Option<&str>,
) -> Result<Option<InterfaceRecord>, (&'static str, String)> {
    let Some(node_count) = node_count else {
        return Ok(None);
    };
    let node_count = parse_node_count(node_count).map_err(|err| (NODE_COUNT_FIELD, err))?;
    let connections = connections
        .map(parse_connections)
        .transpose()
        .map_err(|err| (CONNECTIONS_FIELD, err))?
        .unwrap_or_default();
    Ok(Some(InterfaceRecord::new(node_count, connections)))
}

/// Render connections in the `connections` field format.
pub fn format_connections(connections: &[Connection]) -> String {
    connections
        .iter()
        .map(|connection| {
            let port_map = connection
                .port_map()
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                "{},{},{},{}",
                connection.link(),
                connection.port(),
                connection.key(),
                port_map
            )
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn signed(input: &mut &str) -> PResult<i64> {
    (opt('-'), digit1)
        .take()
        .try_map(str::parse::<i64>)
        .parse_next(input)
}

fn port_map(input: &mut &str) -> PResult<Vec<i64>> {
    delimited(space0, separated(0.., signed, space1), space0).parse_next(input)
}

fn item<'s>(input: &mut &'s str) -> PResult<&'s str> {
    take_while(0.., |c: char| c != ',' && c != ';')
        .map(str::trim)
        .parse_next(input)
}

fn link<'s>(input: &mut &'s str) -> PResult<&'s str> {
    item.verify(|link: &str| !link.is_empty()).parse_next(input)
}

fn port(input: &mut &str) -> PResult<usize> {
    delimited(space0, digit1.try_map(str::parse::<usize>), space0).parse_next(input)
}

fn connection(input: &mut &str) -> PResult<Connection> {
    (link, ',', port, ',', item, ',', port_map)
        .map(|(link, _, port, _, key, _, port_map)| Connection::new(link, port, key, port_map))
        .parse_next(input)
}

fn connections(input: &mut &str) -> PResult<Vec<Connection>> {
    terminated(separated(0.., connection, ';'), opt(';')).parse_next(input)
}
