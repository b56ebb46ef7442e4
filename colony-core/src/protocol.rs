//! Command/response value types exchanged with the growth worker, and the
//! JSON wire codec for drivers that speak `{"type": .., "data": ..}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::ProtocolError,
    geometry::BoundingBox,
    graph::CellSpec,
    types::{CellId, Generation, MediumId, Rgba},
};

/// Driver → engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Command {
    AddCell(CellSpec),
    InitCell(SingleSeed),
    InitCells(BandedSeed),
    GetInitialCellsData,
    Generate(GenerateRange),
}

impl Command {
    /// Every `type` tag the decoder accepts.
    pub const TYPES: [&'static str; 5] = [
        "addCell",
        "initCell",
        "initCells",
        "getInitialCellsData",
        "generate",
    ];

    pub fn type_name(&self) -> &'static str {
        match self {
            Command::AddCell(_) => "addCell",
            Command::InitCell(_) => "initCell",
            Command::InitCells(_) => "initCells",
            Command::GetInitialCellsData => "getInitialCellsData",
            Command::Generate(_) => "generate",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleSeed {
    pub start_index: CellId,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandedSeed {
    pub damp_factor: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRange {
    pub start_gen: Generation,
    pub num_gens: u32,
}

/// Engine → driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum Response {
    SetInitialCellsData(Vec<InitialCellData>),
    UpdateCells(UpdateBatch),
    Error(String),
    Cancelled {
        #[serde(rename = "gen")]
        generation: Option<Generation>,
    },
}

/// Latest state of one mutated cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSnapshot {
    pub index: CellId,
    pub state: Vec<Generation>,
    pub colors: Vec<Rgba>,
    pub latest_generation: Option<Generation>,
}

/// Full per-cell record sent in answer to `getInitialCellsData`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialCellData {
    pub index: CellId,
    pub bounding_box: BoundingBox,
    pub medium: MediumId,
    pub state: Vec<Generation>,
    pub colors: Vec<Rgba>,
}

/// One batcher flush.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBatch {
    pub batch_updates: Vec<CellSnapshot>,
    #[serde(rename = "gen")]
    pub generation: Generation,
}

/// Decodes one wire message, separating unknown types from bad payloads.
pub fn decode_command(json: &str) -> Result<Command, ProtocolError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| ProtocolError::Malformed(err.to_string()))?;
    let ty = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;
    if !Command::TYPES.contains(&ty) {
        return Err(ProtocolError::UnknownMessageType(ty.to_owned()));
    }
    serde_json::from_value(value).map_err(|err| ProtocolError::Malformed(err.to_string()))
}

pub fn encode_response(response: &Response) -> serde_json::Result<String> {
    serde_json::to_string(response)
}
