use serde::Serialize;

use crate::area::AreaResource;
use crate::Result;

/// Label shown for containers whose name field is empty.
pub const UNNAMED_CONTAINER: &str = "<unnamed>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    pub name: String,
    pub first_item_index: u32,
    pub item_count: u32,
    pub items: Vec<String>,
}

impl ContainerSummary {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            UNNAMED_CONTAINER
        } else {
            &self.name
        }
    }
}

/// Snapshot of what an area holds, in current slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaSummary {
    pub actors: Vec<String>,
    pub item_count: usize,
    pub containers: Vec<ContainerSummary>,
}

impl AreaSummary {
    pub fn from_area(area: &AreaResource) -> Result<Self> {
        let actors = area.actors().iter().map(|a| a.name.clone()).collect();

        let containers = area
            .containers()
            .iter()
            .enumerate()
            .map(|(index, container)| {
                let items = area
                    .container_items(index)?
                    .iter()
                    .map(|item| item.resource_reference.clone())
                    .collect();
                Ok(ContainerSummary {
                    name: container.name.clone(),
                    first_item_index: container.first_item_index,
                    item_count: container.item_count,
                    items,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AreaSummary {
            actors,
            item_count: area.items().len(),
            containers,
        })
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(2 + self.actors.len() + self.containers.len());

        lines.push("Actors:".to_string());
        for actor in &self.actors {
            lines.push(format!("  {actor}"));
        }

        lines.push("Containers:".to_string());
        for container in &self.containers {
            lines.push(format!("  {}", container.display_name()));
            for item in &container.items {
                lines.push(format!("    {item}"));
            }
        }

        lines
    }
}

/// Renders actors, then each container followed by its item references.
pub fn report(area: &AreaResource) -> Result<Vec<String>> {
    Ok(AreaSummary::from_area(area)?.lines())
}
