//! Adjacency-list rendering of a relationship graph.
//!
//! Each node is one line with a coloured type tag, its label and laid-out
//! coordinates, followed by its outgoing edges drawn with box glyphs.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::core::network::builder::{Graph, Node};
use crate::core::network::entity::{EntityKey, EntityType};
use crate::tui::theme;

/// Short tag rendered before a node label.
pub fn type_tag(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Person => "PER",
        EntityType::Business => "BIZ",
        EntityType::Location => "LOC",
        EntityType::PhoneNumber => "PHN",
        EntityType::EmailAddress => "EML",
    }
}

/// Line index at which `key`'s node line is drawn.
pub fn line_of(graph: &Graph, key: &EntityKey) -> Option<usize> {
    let mut line = 0;
    for node in &graph.nodes {
        if &node.id == key {
            return Some(line);
        }
        line += 1 + graph.outgoing(&node.id).count();
    }
    None
}

pub struct NetworkView<'a> {
    graph: &'a Graph,
    cursor: Option<EntityKey>,
    selection: &'a [EntityKey],
    scroll_offset: usize,
}

impl<'a> NetworkView<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self {
            graph,
            cursor: None,
            selection: &[],
            scroll_offset: 0,
        }
    }

    pub fn cursor(mut self, key: Option<EntityKey>) -> Self {
        self.cursor = key;
        self
    }

    /// Nodes chosen in connect mode.
    pub fn selection(mut self, keys: &'a [EntityKey]) -> Self {
        self.selection = keys;
        self
    }

    pub fn scroll(mut self, offset: usize) -> Self {
        self.scroll_offset = offset;
        self
    }

    fn build_lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for node in &self.graph.nodes {
            lines.push(self.node_line(node));

            let outgoing: Vec<_> = self.graph.outgoing(&node.id).collect();
            for (i, edge) in outgoing.iter().enumerate() {
                let glyph = if i + 1 == outgoing.len() { "└─" } else { "├─" };
                let arrow = if edge.render_style.directed { "→" } else { "—" };
                let mut spans = vec![
                    Span::raw(format!("    {glyph} ")),
                    Span::styled(
                        format!("({} {}%) {arrow} ", edge.render_style.label, edge.confidence()),
                        Style::default().fg(theme::TEXT_DIM),
                    ),
                ];
                match self.graph.node(&edge.target) {
                    Some(target) => {
                        spans.push(Span::styled(
                            target.label().to_string(),
                            Style::default().fg(theme::TEXT_MUTED),
                        ));
                        spans.push(Span::styled(
                            format!(" [{}]", type_tag(target.entity_type)),
                            Style::default().fg(theme::entity_color(target.entity_type)),
                        ));
                    }
                    None => spans.push(Span::raw(edge.target.to_string())),
                }
                lines.push(Line::from(spans));
            }
        }
        lines
    }

    fn node_line(&self, node: &Node) -> Line<'static> {
        let on_cursor = self.cursor == Some(node.id);
        let selected = self.selection.contains(&node.id);

        let label_style = if on_cursor {
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme::TEXT)
        };

        let mut spans = vec![
            Span::styled(
                if on_cursor { "▸ " } else { "  " }.to_string(),
                Style::default().fg(theme::ACCENT),
            ),
            Span::styled(
                if selected { "● " } else { "  " }.to_string(),
                Style::default().fg(theme::PRIMARY_LIGHT),
            ),
            Span::styled(
                format!("[{}] ", type_tag(node.entity_type)),
                Style::default().fg(theme::entity_color(node.entity_type)),
            ),
            Span::styled(node.label().to_string(), label_style),
        ];
        if let Some(pos) = node.position {
            spans.push(Span::styled(
                format!("  ({:.0}, {:.0})", pos.x, pos.y),
                Style::default().fg(theme::TEXT_DIM),
            ));
        }
        if node.data.is_hub {
            spans.push(Span::styled(" hub", Style::default().fg(theme::WARNING)));
        }
        Line::from(spans)
    }
}

impl Widget for NetworkView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let lines = self.build_lines();
        let visible_height = area.height as usize;
        let max_offset = lines.len().saturating_sub(visible_height);
        let offset = self.scroll_offset.min(max_offset);

        for (i, line) in lines.iter().skip(offset).take(visible_height).enumerate() {
            let y = area.y + i as u16;
            let max_x = area.x + area.width;
            let mut x = area.x;
            for span in &line.spans {
                if x >= max_x {
                    break;
                }
                let text: String = span.content.chars().take((max_x - x) as usize).collect();
                let width = text.chars().count() as u16;
                buf.set_string(x, y, &text, span.style);
                x += width;
            }
        }
    }
}
