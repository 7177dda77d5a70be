//! Chart-widget projection of an enriched forest.

use crate::model::person::PersonId;
use crate::model::position::PositionId;
use crate::model::unit::UnitId;
use crate::service::hierarchy::{HolderNode, PositionNode, UnitNode};
use serde::{Deserialize, Serialize};

/// One chart box; mirrors a [`UnitNode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartNode {
    pub id: UnitId,
    pub name: String,
    pub positions: Vec<ChartPosition>,
    pub children: Vec<ChartNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPosition {
    pub id: PositionId,
    pub title: String,
    pub is_leadership: bool,
    pub holders: Vec<ChartHolder>,
}

/// Holder label; `name` and `photo_url` are `None` for unresolved people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartHolder {
    pub person_id: PersonId,
    pub name: Option<String>,
    pub photo_url: Option<String>,
}

/// Converts a forest into chart nodes with the same shape.
pub fn to_chart_nodes(forest: &[UnitNode]) -> Vec<ChartNode> {
    forest.iter().map(chart_node).collect()
}

fn chart_node(node: &UnitNode) -> ChartNode {
    ChartNode {
        id: node.unit.id,
        name: node.unit.name.clone(),
        positions: node.positions.iter().map(chart_position).collect(),
        children: to_chart_nodes(&node.children),
    }
}

fn chart_position(node: &PositionNode) -> ChartPosition {
    ChartPosition {
        id: node.position.id,
        title: node.position.title.clone(),
        is_leadership: node.position.is_leadership,
        holders: node.holders.iter().map(chart_holder).collect(),
    }
}

fn chart_holder(holder: &HolderNode) -> ChartHolder {
    ChartHolder {
        person_id: holder.assignment.person_id,
        name: holder.person.as_ref().map(|person| person.full_name.clone()),
        photo_url: holder
            .person
            .as_ref()
            .map(|person| person.contact.photo_url.clone()),
    }
}
