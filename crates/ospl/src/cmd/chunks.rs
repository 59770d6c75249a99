use ospl_afe::config_string;
use ospl_packet::codec::{HEADER_SIZE, PARAM_DATA_SIZE, SET_DESCRIPTOR_SIZE};
use ospl_packet::param::{self, RX_SET_EXTERNAL_CONFIG};
use ospl_packet::{plan_chunks, ExtConfigChunk};
use serde::Serialize;

use crate::cmd::{parse_param_id, ChunksArgs};
use crate::exit::{io_error, packet_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{hex_id, print_json, print_table, OutputFormat};

#[derive(Serialize)]
struct ChunkRow {
    index: usize,
    offset: usize,
    chunk_size: u32,
    done: bool,
    pkt_size: usize,
}

#[derive(Serialize)]
struct ChunksOutput {
    file: String,
    param_id: String,
    file_size: usize,
    total_size: u32,
    chunks: Vec<ChunkRow>,
}

pub fn run(args: ChunksArgs, format: OutputFormat) -> CliResult<i32> {
    let param_id = match args.param.as_deref() {
        Some(raw) => parse_param_id(raw)?,
        None => RX_SET_EXTERNAL_CONFIG,
    };
    if !param::is_external_config(param_id) {
        return Err(CliError::new(
            USAGE,
            format!("{} is not an external-config parameter", hex_id(param_id)),
        ));
    }

    let content = std::fs::read(&args.file)
        .map_err(|err| io_error(&format!("failed reading {}", args.file.display()), err))?;
    let config = config_string(&content);
    let plan = plan_chunks(config).map_err(|err| packet_error("chunk planning failed", err))?;
    let total_size = plan.total_size();

    let mut offset = 0usize;
    let chunks = plan
        .enumerate()
        .map(|(index, chunk)| {
            let row = chunk_row(index, offset, &chunk);
            offset += chunk.bytes.len();
            row
        })
        .collect();

    let out = ChunksOutput {
        file: args.file.display().to_string(),
        param_id: hex_id(param_id),
        file_size: content.len(),
        total_size,
        chunks,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            &["#", "OFFSET", "CHUNK_SIZE", "DONE", "PKT_SIZE"],
            out.chunks
                .iter()
                .map(|row| {
                    vec![
                        row.index.to_string(),
                        row.offset.to_string(),
                        row.chunk_size.to_string(),
                        u8::from(row.done).to_string(),
                        row.pkt_size.to_string(),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty => {
            println!(
                "{} -> {} total_size={} chunks={}",
                out.file,
                out.param_id,
                out.total_size,
                out.chunks.len()
            );
            for row in &out.chunks {
                println!(
                    "  #{} offset={} chunk_size={} done={} pkt_size={}",
                    row.index,
                    row.offset,
                    row.chunk_size,
                    u8::from(row.done),
                    row.pkt_size
                );
            }
        }
    }
    Ok(SUCCESS)
}

fn chunk_row(index: usize, offset: usize, chunk: &ExtConfigChunk<'_>) -> ChunkRow {
    ChunkRow {
        index,
        offset,
        chunk_size: chunk.chunk_size(),
        done: chunk.done,
        pkt_size: HEADER_SIZE + SET_DESCRIPTOR_SIZE + PARAM_DATA_SIZE + chunk.wire_size(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_row_matches_wire_sizes() {
        let bytes = [b'a'; 10];
        let chunk = ExtConfigChunk {
            total_size: 10,
            done: true,
            bytes: &bytes,
        };
        let row = chunk_row(0, 0, &chunk);
        assert_eq!(row.pkt_size, 57 + 10);
        assert_eq!(row.chunk_size, 10);
    }
}
