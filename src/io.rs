//! Edge-list input and distance output
//!
//! Two framings are supported. The text framing is a header line holding
//! the vertex count followed by one `from to weight` line per edge; blank
//! lines and lines starting with `#` are ignored. The binary framing is a
//! little-endian `u32` vertex count followed by `(u32 from, u32 to, u64
//! weight)` records.
//!
//! In both framings a weight of zero means "no edge": such records are
//! skipped on input, and unreachable pairs are written back as zero.

use std::fmt::Display;
use std::io::{BufRead, Read, Write};
use std::str::FromStr;

use num_traits::{NumCast, ToPrimitive};

use crate::distance::Distance;
use crate::graph::{DirectedGraph, MutableGraph};
use crate::matrix::Block;
use crate::solver::Solution;
use crate::{Error, Result};

fn parse_field<T: FromStr>(field: Option<&str>, line: usize, what: &str) -> Result<T> {
    let field = field.ok_or_else(|| Error::Parse {
        line,
        message: format!("missing {}", what),
    })?;
    field.parse().map_err(|_| Error::Parse {
        line,
        message: format!("invalid {}: {:?}", what, field),
    })
}

/// Reads a graph in the text framing
pub fn read_edge_list<R, D>(reader: R) -> Result<DirectedGraph<D>>
where
    R: BufRead,
    D: Distance + FromStr,
{
    let mut graph: Option<DirectedGraph<D>> = None;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut fields = trimmed.split_whitespace();

        if graph.is_none() {
            let vertices: usize = parse_field(fields.next(), number, "vertex count")?;
            graph = Some(DirectedGraph::with_capacity(vertices));
            continue;
        }
        let Some(graph) = graph.as_mut() else {
            continue;
        };

        let from: usize = parse_field(fields.next(), number, "source vertex")?;
        let to: usize = parse_field(fields.next(), number, "target vertex")?;
        let weight: D = parse_field(fields.next(), number, "weight")?;
        if fields.next().is_some() {
            return Err(Error::Parse {
                line: number,
                message: "trailing fields after weight".to_string(),
            });
        }
        if weight == D::zero() {
            continue;
        }
        graph.add_edge(from, to, weight)?;
    }

    graph.ok_or(Error::Parse {
        line: 0,
        message: "missing vertex count header".to_string(),
    })
}

/// Writes every pair of a relaxed solution in the text framing
///
/// Pairs are written in row-major order of the original vertex ids.
pub fn write_distances<W, B>(mut writer: W, solution: &Solution<B>) -> Result<()>
where
    W: Write,
    B: Block,
    B::Value: Display,
{
    let n = solution.vertex_count();
    let dense = solution.to_dense()?;
    writeln!(writer, "{}", n)?;
    for from in 0..n {
        for to in 0..n {
            let distance = dense[from * n + to];
            if distance.is_sentinel() {
                writeln!(writer, "{} {} 0", from, to)?;
            } else {
                writeln!(writer, "{} {} {}", from, to, distance)?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

/// Reads a graph in the binary framing, until end of input
pub fn read_binary<R, D>(mut reader: R) -> Result<DirectedGraph<D>>
where
    R: Read,
    D: Distance + NumCast,
{
    let vertices = read_u32(&mut reader)? as usize;
    let mut graph = DirectedGraph::with_capacity(vertices);
    loop {
        let mut head = [0u8; 4];
        match reader.read_exact(&mut head) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err.into()),
        }
        let from = u32::from_le_bytes(head) as usize;
        let to = read_u32(&mut reader)? as usize;
        let raw = read_u64(&mut reader)?;
        if raw == 0 {
            continue;
        }
        let weight = <D as NumCast>::from(raw).ok_or(Error::WeightOutOfRange { from, to })?;
        graph.add_edge(from, to, weight)?;
    }
    Ok(graph)
}

/// Writes every pair of a relaxed solution in the binary framing
///
/// Weights must be non-negative and are truncated to integers.
pub fn write_binary<W, B>(mut writer: W, solution: &Solution<B>) -> Result<()>
where
    W: Write,
    B: Block,
    B::Value: ToPrimitive,
{
    let n = solution.vertex_count();
    let count = u32::try_from(n).map_err(|_| Error::VertexOutOfRange {
        vertex: n,
        count: u32::MAX as usize,
    })?;
    let dense = solution.to_dense()?;
    writer.write_all(&count.to_le_bytes())?;
    for from in 0..n {
        for to in 0..n {
            let distance = dense[from * n + to];
            let raw = if distance.is_sentinel() {
                0
            } else {
                distance.to_u64().ok_or(Error::WeightOutOfRange { from, to })?
            };
            writer.write_all(&(from as u32).to_le_bytes())?;
            writer.write_all(&(to as u32).to_le_bytes())?;
            writer.write_all(&raw.to_le_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}
