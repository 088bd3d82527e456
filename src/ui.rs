use ratatui::{
    layout::{Constraint, Direction, Layout as Split},
    style::Style,
    widgets::{Block, Borders},
    Frame,
};

use crate::app::App;
use crate::components::filter_bar::FilterBarWidget;
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree_view::TreeViewWidget;

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let chunks = Split::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let border = |focused: bool| {
        Style::default().fg(if focused {
            app.theme.border_focused_fg
        } else {
            app.theme.border_fg
        })
    };

    let filter_block = Block::default()
        .title(" Filter ")
        .borders(Borders::ALL)
        .border_style(border(app.filter.focused));
    frame.render_widget(
        FilterBarWidget::new(&app.filter, &app.theme).block(filter_block),
        chunks[0],
    );

    let tree_block = Block::default()
        .title(format!(" {} ", app.title))
        .borders(Borders::ALL)
        .border_style(border(!app.filter.focused));
    app.tree_area = tree_block.inner(chunks[1]);
    // Keep the cursor visible before drawing.
    app.update_scroll(app.tree_area.height as usize);

    let layout = app.layout();
    let tree_widget = TreeViewWidget::new(app.tree.document(), &layout, &app.theme)
        .cursor(app.cursor)
        .scroll(app.scroll)
        .selected(app.tree.selected_element())
        .block(tree_block);
    frame.render_widget(tree_widget, chunks[1]);

    let summary = app.summary();
    let selection = app.selection_label();
    let mut status = StatusBarWidget::new(&summary, &app.theme);
    if let Some(selection) = selection.as_deref() {
        status = status.selection(selection);
    }
    if let Some((msg, is_error, _)) = &app.status_message {
        status = status.status_message(msg, *is_error);
    }
    frame.render_widget(status, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use json_tree::config::AppConfig;
    use json_tree::tree::Node;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn draws_all_panels_and_records_tree_area() {
        let root = Node::new(1, "root").child(Node::new(2, "alpha"));
        let mut app = App::new(root, &AppConfig::default(), "sample.json").unwrap();
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let buf = terminal.backend().buffer();
        let text: String = (0..12)
            .map(|y| {
                (0..60)
                    .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
                    .collect::<String>()
                    + "\n"
            })
            .collect();
        assert!(text.contains("Filter"));
        assert!(text.contains("press / to filter"));
        assert!(text.contains("sample.json"));
        assert!(text.contains("root"));
        assert!(text.contains("2 nodes"));

        // 3 filter rows, then the bordered tree panel, then 1 status row.
        assert_eq!(app.tree_area.y, 4);
        assert_eq!(app.tree_area.height, 6);
        assert_eq!(app.viewport_height, 6);
    }
}
