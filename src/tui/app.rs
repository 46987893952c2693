use std::io;
use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};

use super::events::{map_key, Action, AppEvent, Notification, NotificationLevel, CONFIDENCE_STEP};
use super::theme;
use super::widgets::network_view::{line_of, NetworkView};
use crate::core::network::controller::NetworkController;
use crate::core::network::entity::{EntityKey, EntityType};
use crate::core::network::error::NetworkError;
use crate::core::network::gateway::EntityGateway;
use crate::core::network::interaction::InteractionState;
use crate::core::network::relationship::MAX_CONFIDENCE;

/// Central application state.
pub struct App<G: EntityGateway + ?Sized> {
    /// Whether the app is still running.
    pub running: bool,
    controller: NetworkController<G>,
    /// Index of the cursor node in the current view.
    cursor: usize,
    /// Index into the allowed types of the selected pair.
    type_choice: usize,
    /// Active notifications (max 3 visible).
    pub notifications: Vec<Notification>,
    notification_counter: u64,
}

impl<G: EntityGateway + ?Sized> App<G> {
    pub fn new(controller: NetworkController<G>) -> Self {
        Self {
            running: true,
            controller,
            cursor: 0,
            type_choice: 0,
            notifications: Vec::new(),
            notification_counter: 0,
        }
    }

    pub fn controller(&self) -> &NetworkController<G> {
        &self.controller
    }

    // ── Event loop ──────────────────────────────────────────────────────

    /// Main event loop: render → select → update → loop.
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        tick_rate: Duration,
    ) -> io::Result<()> {
        let mut tick_interval = tokio::time::interval(tick_rate);
        let mut event_stream = EventStream::new();

        self.handle_action(Action::Refresh).await;

        while self.running {
            terminal.draw(|frame| self.render(frame))?;

            let event = tokio::select! {
                _ = tick_interval.tick() => AppEvent::Tick,
                Some(Ok(crossterm_event)) = event_stream.next() => AppEvent::Input(crossterm_event),
            };
            self.handle_event(event).await;
        }

        Ok(())
    }

    async fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Tick => self.on_tick(),
            AppEvent::Input(Event::Key(key)) => {
                if let Some(action) = map_key(key) {
                    self.handle_action(action).await;
                }
            }
            AppEvent::Input(_) => {}
        }
    }

    pub async fn handle_action(&mut self, action: Action) {
        match action {
            Action::CursorDown => {
                let len = self.controller.view().nodes.len();
                if self.cursor + 1 < len {
                    self.cursor += 1;
                }
            }
            Action::CursorUp => self.cursor = self.cursor.saturating_sub(1),
            Action::CycleLayout => {
                let next = self.controller.layout_algorithm().next();
                self.controller.set_layout(next);
                self.push_notification(format!("Layout: {next}"), NotificationLevel::Info);
            }
            Action::ToggleIsolated => {
                let spec = self.controller.filter_spec().clone();
                let show = !spec.show_isolated_nodes;
                self.controller.set_filter(spec.with_isolated(show));
                self.clamp_cursor();
            }
            Action::ToggleType(entity_type) => {
                let mut spec = self.controller.filter_spec().clone();
                spec.toggle_type(entity_type);
                self.controller.set_filter(spec);
                self.clamp_cursor();
            }
            Action::ConfidenceUp | Action::ConfidenceDown => {
                let spec = self.controller.filter_spec().clone();
                let floor = if action == Action::ConfidenceUp {
                    spec.min_confidence.saturating_add(CONFIDENCE_STEP).min(MAX_CONFIDENCE)
                } else {
                    spec.min_confidence.saturating_sub(CONFIDENCE_STEP)
                };
                self.controller.set_filter(spec.with_min_confidence(floor));
                self.clamp_cursor();
            }
            Action::BeginConnect => {
                self.controller.begin_connect();
                self.type_choice = 0;
                self.push_notification(
                    "Connect: select two entities with space".to_string(),
                    NotificationLevel::Info,
                );
            }
            Action::SelectNode => {
                if let Some(key) = self.cursor_key() {
                    self.controller.on_node_selected(key);
                    self.type_choice = 0;
                }
            }
            Action::CycleRelationshipType => {
                let count = self.controller.allowed_types_for_selection().len();
                if count > 0 {
                    self.type_choice = (self.type_choice + 1) % count;
                }
            }
            Action::ConfirmConnect => self.confirm_connect().await,
            Action::DeleteEdge => self.delete_cursor_edge().await,
            Action::Refresh => {
                if let Err(e) = self.controller.refresh().await {
                    self.report_error("Refresh failed", &e);
                }
                self.clamp_cursor();
            }
            Action::Cancel => self.controller.cancel_connect(),
            Action::Quit => self.running = false,
        }
    }

    async fn confirm_connect(&mut self) {
        let allowed = self.controller.allowed_types_for_selection();
        let Some(relationship_type) = allowed.get(self.type_choice).cloned() else {
            let message = if self.controller.interaction().pair().is_some() {
                "No relationship type is allowed for this pair"
            } else {
                "Select two entities first"
            };
            self.push_notification(message.to_string(), NotificationLevel::Warning);
            return;
        };

        let label = relationship_type.to_string();
        match self
            .controller
            .on_connect_requested(relationship_type, None, None)
            .await
        {
            Ok(refreshed) => {
                self.type_choice = 0;
                self.push_notification(format!("Connected ({label})"), NotificationLevel::Success);
                if !refreshed {
                    self.notify_stale_view();
                }
            }
            Err(e) => self.report_error("Connect failed", &e),
        }
        self.clamp_cursor();
    }

    async fn delete_cursor_edge(&mut self) {
        let Some(key) = self.cursor_key() else {
            return;
        };
        let first_edge = self
            .controller
            .view()
            .outgoing(&key)
            .next()
            .map(|e| e.id.clone());
        let Some(edge_id) = first_edge else {
            self.push_notification("No outgoing edge to delete".to_string(), NotificationLevel::Warning);
            return;
        };

        match self.controller.on_edge_delete_requested(&edge_id).await {
            Ok(refreshed) => {
                self.push_notification("Relationship deleted".to_string(), NotificationLevel::Success);
                if !refreshed {
                    self.notify_stale_view();
                }
            }
            Err(e) => self.report_error("Delete failed", &e),
        }
        self.clamp_cursor();
    }

    fn notify_stale_view(&mut self) {
        self.push_notification(
            "Saved, but the view could not be reloaded; press r".to_string(),
            NotificationLevel::Warning,
        );
    }

    fn cursor_key(&self) -> Option<EntityKey> {
        self.controller.view().nodes.get(self.cursor).map(|n| n.id)
    }

    fn clamp_cursor(&mut self) {
        let len = self.controller.view().nodes.len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    fn report_error(&mut self, context: &str, error: &NetworkError) {
        log::warn!("{context}: {error}");
        let hint = if error.is_retryable() { " (retry)" } else { "" };
        self.push_notification(format!("{context}: {error}{hint}"), NotificationLevel::Error);
    }

    // ── Notifications ───────────────────────────────────────────────────

    /// Push a notification (dedup by message, max 3).
    pub fn push_notification(&mut self, message: String, level: NotificationLevel) {
        if self.notifications.iter().any(|n| n.message == message) {
            return;
        }

        self.notification_counter += 1;
        self.notifications.push(Notification {
            id: self.notification_counter,
            message,
            level,
            ttl_ticks: 100,
        });

        while self.notifications.len() > 3 {
            self.notifications.remove(0);
        }
    }

    fn on_tick(&mut self) {
        for n in &mut self.notifications {
            n.ttl_ticks = n.ttl_ticks.saturating_sub(1);
        }
        self.notifications.retain(|n| n.ttl_ticks > 0);
    }

    // ── Rendering ───────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let [header, body, status] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .areas(area);

        self.render_header(frame, header);
        self.render_graph(frame, body);
        self.render_status_bar(frame, status);
        self.render_notifications(frame, area);

        if let InteractionState::ReadyToConnect { .. } = self.controller.interaction() {
            self.render_connect_dialog(frame, area);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let view = self.controller.view();
        let spec = self.controller.filter_spec();

        let mut types: Vec<Span> = Vec::new();
        for (i, entity_type) in EntityType::ALL.into_iter().enumerate() {
            let style = if spec.entity_types.contains(&entity_type) {
                Style::default().fg(theme::entity_color(entity_type))
            } else {
                theme::key_hint()
            };
            types.push(Span::styled(format!("{}:{} ", i + 1, entity_type), style));
        }

        let mut first = vec![
            Span::styled(format!("{} nodes", view.stats.node_count), theme::heading()),
            Span::raw(" · "),
            Span::styled(format!("{} edges", view.stats.edge_count), theme::heading()),
            Span::raw(" │ "),
        ];
        first.extend(types);

        let warnings = self.controller.report().warnings.len();
        let mut second = vec![
            Span::styled("layout ", theme::muted()),
            Span::raw(self.controller.layout_algorithm().to_string()),
            Span::styled("  min confidence ", theme::muted()),
            Span::raw(format!("{}%", spec.min_confidence)),
            Span::styled("  isolated ", theme::muted()),
            Span::raw(if spec.show_isolated_nodes { "shown" } else { "hidden" }),
        ];
        if let Some((label, degree)) = view.stats.most_connected_entities.first() {
            second.push(Span::styled("  top ", theme::muted()));
            second.push(Span::raw(format!("{label} ({degree})")));
        }
        if warnings > 0 {
            second.push(Span::styled(
                format!("  {warnings} records skipped"),
                Style::default().fg(theme::WARNING),
            ));
        }

        frame.render_widget(
            Paragraph::new(vec![Line::from(first), Line::from(second)]),
            area,
        );
    }

    fn render_graph(&self, frame: &mut Frame, area: Rect) {
        let block = theme::block_focused("Network");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let view = self.controller.view();
        let cursor = self.cursor_key();
        let cursor_line = cursor.and_then(|k| line_of(view, &k)).unwrap_or(0);
        let height = inner.height as usize;
        let scroll = (cursor_line + 1).saturating_sub(height);

        let selection = self.controller.interaction().selection();
        frame.render_widget(
            NetworkView::new(view)
                .cursor(cursor)
                .selection(&selection)
                .scroll(scroll),
            inner,
        );
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mode = match self.controller.interaction() {
            InteractionState::Idle => Span::raw(""),
            state => Span::styled(
                format!(" CONNECT {}/2 ", state.selection().len()),
                theme::mode_badge(),
            ),
        };

        let mut spans = vec![
            Span::styled(" case-graph ", theme::brand_badge()),
            Span::raw(" "),
            mode,
            Span::raw(" "),
            Span::styled(
                format!("{} workflow", self.controller.workflow()),
                Style::default().fg(theme::PRIMARY_LIGHT),
            ),
            Span::raw(" │ "),
        ];
        for (key, what) in [
            ("j/k", "move "),
            ("l", "layout "),
            ("i", "isolated "),
            ("1-5", "types "),
            ("+/-", "confidence "),
            ("c", "connect "),
            ("d", "delete "),
            ("r", "refresh "),
            ("q", "quit"),
        ] {
            spans.push(Span::styled(key, theme::key_hint()));
            spans.push(Span::raw(format!(":{what}")));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_connect_dialog(&self, frame: &mut Frame, area: Rect) {
        let Some((first, second)) = self.controller.interaction().pair() else {
            return;
        };
        let view = self.controller.view();
        let label = |key: EntityKey| {
            view.node(&key)
                .map(|n| n.label().to_string())
                .unwrap_or_else(|| key.to_string())
        };

        let mut lines = vec![
            Line::from(vec![
                Span::styled(label(first), theme::title()),
                Span::raw(" → "),
                Span::styled(label(second), theme::title()),
            ]),
            Line::raw(""),
        ];
        let allowed = self.controller.allowed_types_for_selection();
        if allowed.is_empty() {
            lines.push(Line::styled(
                "No relationship type is allowed for this pair",
                Style::default().fg(theme::WARNING),
            ));
        }
        for (i, relationship_type) in allowed.iter().enumerate() {
            let line = if i == self.type_choice {
                Line::styled(format!("▸ {relationship_type}"), theme::title())
            } else {
                Line::styled(format!("  {relationship_type}"), Style::default().fg(theme::TEXT))
            };
            lines.push(line);
        }
        lines.push(Line::raw(""));
        lines.push(Line::from(vec![
            Span::styled("Tab", theme::key_hint()),
            Span::raw(":type "),
            Span::styled("Enter", theme::key_hint()),
            Span::raw(":connect "),
            Span::styled("Esc", theme::key_hint()),
            Span::raw(":cancel"),
        ]));

        let block = Block::default()
            .title(" Connect ")
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::ACCENT));

        let modal = centered_rect(50, 50, area);
        frame.render_widget(Clear, modal);
        frame.render_widget(Paragraph::new(lines).block(block), modal);
    }

    fn render_notifications(&self, frame: &mut Frame, area: Rect) {
        if self.notifications.is_empty() {
            return;
        }

        let max_width = 60.min(area.width.saturating_sub(2));
        let height = self.notifications.len() as u16;
        let x = area.width.saturating_sub(max_width + 1);
        let notification_area = Rect::new(x, 1, max_width, height);

        let lines: Vec<Line> = self
            .notifications
            .iter()
            .map(|n| {
                let (prefix, color) = match n.level {
                    NotificationLevel::Info => ("ℹ", theme::INFO),
                    NotificationLevel::Success => ("✓", theme::SUCCESS),
                    NotificationLevel::Warning => ("⚠", theme::WARNING),
                    NotificationLevel::Error => ("✗", theme::ERROR),
                };
                Line::from(vec![
                    Span::styled(format!(" {prefix} "), Style::default().fg(color).bold()),
                    Span::raw(n.message.as_str()),
                ])
            })
            .collect();

        frame.render_widget(Clear, notification_area);
        frame.render_widget(Paragraph::new(lines), notification_area);
    }
}

/// Calculate a centered rect using percentage of parent area.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);

    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}
