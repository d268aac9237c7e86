// Wire protocol DTOs and conversions for public room messages.

use crate::domain::{
    Action, ActionLogEntry, ActionRejection, Attributes, Direction, Enemy, LootItem, Phase,
    Player, Position, SessionSnapshot, ShopItem, SpellTarget, Winner,
};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    // Full room view after every accepted change.
    Snapshot(SnapshotDto),
    // Sent only to the submitter; the turn is kept.
    Rejected { reason: String },
    // Accepted but without effect; the turn was consumed.
    Ignored { reason: String },
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Action(ActionDto),
}

/// Loosely typed action payload. Shape is checked when converting to `Action`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionDto {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    // "enemy" (default) or "player"; only read by spells.
    #[serde(default)]
    pub target_kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub to_player: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub tag: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String, ActionRejection> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ActionRejection::UnrecognizedInput(format!("missing field `{field}`")))
}

fn positive_amount(value: Option<i64>) -> Result<u32, ActionRejection> {
    let amount = value.ok_or_else(|| {
        ActionRejection::UnrecognizedInput("missing field `amount`".to_string())
    })?;
    match u32::try_from(amount) {
        Ok(amount) if amount > 0 => Ok(amount),
        _ => Err(ActionRejection::InvalidAmount),
    }
}

impl TryFrom<ActionDto> for Action {
    type Error = ActionRejection;

    fn try_from(dto: ActionDto) -> Result<Self, Self::Error> {
        let action = match dto.kind.as_str() {
            "move" => {
                let raw = required(dto.direction, "direction")?;
                let direction = Direction::parse(&raw).ok_or_else(|| {
                    ActionRejection::UnrecognizedInput(format!("unknown direction {raw:?}"))
                })?;
                Action::Move { direction }
            }
            "attack" => Action::Attack {
                target: required(dto.target, "target")?,
            },
            "spell" => {
                let name = required(dto.name, "name")?;
                let target = required(dto.target, "target")?;
                let target = match dto.target_kind.as_deref().unwrap_or("enemy") {
                    "enemy" => SpellTarget::Enemy(target),
                    "player" => SpellTarget::Player(target),
                    other => {
                        return Err(ActionRejection::UnrecognizedInput(format!(
                            "unknown target_kind {other:?}"
                        )));
                    }
                };
                Action::Spell { name, target }
            }
            "use_item" => Action::UseItem {
                item: required(dto.item, "item")?,
            },
            "trade" => Action::Trade {
                item: required(dto.item, "item")?,
                to_player: required(dto.to_player, "to_player")?,
            },
            "give_gold" => Action::GiveGold {
                amount: positive_amount(dto.amount)?,
                to_player: required(dto.to_player, "to_player")?,
            },
            "buy" => Action::Buy {
                item: required(dto.item, "item")?,
            },
            "sell" => Action::Sell {
                item: required(dto.item, "item")?,
            },
            "gain_xp" => Action::GainXp {
                amount: positive_amount(dto.amount)?,
            },
            "apply_status" => Action::ApplyStatus {
                tag: required(dto.tag, "tag")?,
            },
            "claim_loot" => Action::ClaimLoot {
                item: required(dto.item, "item")?,
            },
            "next_phase" => Action::NextPhase,
            other => {
                return Err(ActionRejection::UnrecognizedInput(format!(
                    "unknown action type {other:?}"
                )));
            }
        };
        Ok(action)
    }
}

/// Body of `POST /rooms/{room_id}/join`.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinRoomRequest {
    pub player_id: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub subclass: Option<String>,
    // Load the character saved under `slot` instead of creating one.
    #[serde(default)]
    pub resume: bool,
    #[serde(default)]
    pub slot: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomListResponse {
    pub rooms: Vec<String>,
}

/// Player record for the wire. Hit points never go below zero here.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerDto {
    pub id: String,
    pub class: String,
    pub subclass: String,
    pub level: u32,
    pub xp: u32,
    pub attributes: Attributes,
    pub hp: i32,
    pub max_hp: i32,
    pub alive: bool,
    pub position: Position,
    pub gold: u32,
    pub inventory: Vec<String>,
    pub spells: Vec<String>,
    pub weapon: String,
    pub passives: Vec<String>,
    pub statuses: Vec<String>,
    pub achievements: Vec<String>,
    pub save_slot: String,
}

impl From<&Player> for PlayerDto {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            class: player.class.clone(),
            subclass: player.subclass.clone(),
            level: player.level,
            xp: player.xp,
            attributes: player.attributes,
            hp: player.hp.max(0),
            max_hp: player.max_hp,
            alive: player.is_alive(),
            position: player.position,
            gold: player.gold,
            inventory: player.inventory.clone(),
            spells: player.spells.clone(),
            weapon: player.weapon.clone(),
            passives: player.passives.clone(),
            statuses: player.statuses.clone(),
            achievements: player.achievements.clone(),
            save_slot: player.save_slot.clone(),
        }
    }
}

/// Room view sent to clients and returned by `GET /rooms/{room_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDto {
    pub room_id: String,
    pub players: Vec<PlayerDto>,
    pub player_order: Vec<String>,
    pub turn: Option<String>,
    pub phase: Phase,
    pub grid: Vec<Vec<Option<String>>>,
    pub enemies: Vec<Enemy>,
    pub shop: Vec<ShopItem>,
    pub loot: Vec<LootItem>,
    pub encounter_index: usize,
    pub round: u32,
    pub winner: Option<Winner>,
    pub last_action: Option<ActionLogEntry>,
}

impl From<SessionSnapshot> for SnapshotDto {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            room_id: snapshot.room_id,
            players: snapshot.players.iter().map(PlayerDto::from).collect(),
            player_order: snapshot.player_order,
            turn: snapshot.turn,
            phase: snapshot.phase,
            grid: snapshot.grid,
            enemies: snapshot.enemies,
            shop: snapshot.shop,
            loot: snapshot.loot,
            encounter_index: snapshot.encounter_index,
            round: snapshot.round,
            winner: snapshot.winner,
            last_action: snapshot.last_action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<Action, ActionRejection> {
        let ClientMessage::Action(dto) = serde_json::from_str(raw).expect("valid envelope");
        Action::try_from(dto)
    }

    #[test]
    fn when_move_is_well_formed_then_action_is_built() {
        let action = parse(r#"{"type":"action","data":{"type":"move","direction":"Up"}}"#);
        assert_eq!(
            action,
            Ok(Action::Move {
                direction: Direction::Up
            })
        );
    }

    #[test]
    fn when_direction_is_unknown_then_input_is_unrecognized() {
        let action = parse(r#"{"type":"action","data":{"type":"move","direction":"sideways"}}"#);
        assert!(matches!(action, Err(ActionRejection::UnrecognizedInput(_))));
    }

    #[test]
    fn when_action_type_is_unknown_then_input_is_unrecognized() {
        let action = parse(r#"{"type":"action","data":{"type":"dance"}}"#);
        assert!(matches!(action, Err(ActionRejection::UnrecognizedInput(_))));
    }

    #[test]
    fn when_heal_targets_player_then_target_kind_is_respected() {
        let action = parse(
            r#"{"type":"action","data":{"type":"spell","name":"Heal","target":"bob","target_kind":"player"}}"#,
        );
        assert_eq!(
            action,
            Ok(Action::Spell {
                name: "Heal".into(),
                target: SpellTarget::Player("bob".into()),
            })
        );
    }

    #[test]
    fn when_amount_is_negative_then_amount_is_invalid() {
        let action =
            parse(r#"{"type":"action","data":{"type":"give_gold","amount":-5,"to_player":"b"}}"#);
        assert_eq!(action, Err(ActionRejection::InvalidAmount));
    }

    #[test]
    fn when_snapshot_has_fallen_player_then_hp_is_clamped() {
        let mut player = crate::domain::entities::fixtures::player("a", 5, 0);
        player.hp = -4;
        let dto = PlayerDto::from(&player);
        assert_eq!(dto.hp, 0);
        assert!(!dto.alive);
    }

    #[test]
    fn when_server_message_is_serialized_then_it_uses_type_and_data() {
        let msg = ServerMessage::Rejected {
            reason: "not your turn".into(),
        };
        let json = serde_json::to_value(&msg).expect("serializes");
        assert_eq!(
            json,
            serde_json::json!({"type": "rejected", "data": {"reason": "not your turn"}})
        );
    }
}
