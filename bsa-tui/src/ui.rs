//! Terminal UI rendering with ratatui

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use bsa_core::models::Related;
use bsa_core::{Brand, Category, Product, RequestState};

use crate::app::{App, DetailRecord, DetailView, InputMode, Screen, StatusLevel};
use crate::form::{Form, RecordKind};

/// Main draw function
pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Min(1),    // Screen body
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    draw_title_bar(f, app, chunks[0]);

    match app.screen {
        Screen::Auth => draw_auth(f, app, chunks[1]),
        Screen::Home => draw_home(f, app, chunks[1]),
        Screen::Records(kind) => draw_records(f, app, kind, chunks[1]),
    }

    draw_status_bar(f, app, chunks[2]);

    match &app.input_mode {
        InputMode::Form(record) if app.screen != Screen::Auth => {
            let verb = if record.is_edit() { "Edit" } else { "New" };
            let title = format!(" {} {} ", verb, record.kind.title());
            draw_form_popup(f, &title, &record.form);
        }
        InputMode::Confirm { kind, name, .. } => {
            draw_confirm(f, &format!("Delete {} \"{}\"? (y/n)", kind.title(), name));
        }
        _ => {}
    }
}

fn draw_title_bar(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        " BSA Dashboard ",
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )];

    if app.screen != Screen::Auth {
        for screen in Screen::TABS {
            let style = if screen == app.screen {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::raw(" "));
            spans.push(Span::styled(format!(" {} ", screen.title()), style));
        }

        let user = app.session.state().user.map(|u| u.name).unwrap_or_default();
        spans.push(Span::styled(
            format!("  [{}]", user),
            Style::default().fg(Color::Green),
        ));
    }

    let title_bar = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    f.render_widget(title_bar, area);
}

fn draw_auth(f: &mut Frame, app: &App, area: Rect) {
    let title = if app.auth_form.register {
        " Register "
    } else {
        " Login "
    };
    let rect = centered(area, 50, app.auth_form.form.fields.len() as u16 * 3 + 4);
    draw_form(f, title, &app.auth_form.form, rect);

    let hint_area = Rect {
        y: (rect.y + rect.height).min(area.bottom().saturating_sub(1)),
        height: 1,
        ..rect
    };
    let hint = if app.session.state().fetching {
        "Please wait..."
    } else if app.auth_form.register {
        "Enter:register  Ctrl+T:back to login  Esc:quit"
    } else {
        "Enter:login  Ctrl+T:create an account  Esc:quit"
    };
    f.render_widget(
        Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
        hint_area,
    );
}

fn draw_home(f: &mut Frame, app: &App, area: Rect) {
    let state = app.dashboard.state();
    let lines = match state.entity {
        Some(stats) => vec![
            total_line("Products", stats.products_total),
            total_line("Categories", stats.categories_total),
            total_line("Brands", stats.brands_total),
        ],
        None if state.fetching => vec![Line::from("Loading...")],
        None => vec![Line::from("No data")],
    };

    let block = Block::default().borders(Borders::ALL).title(" Totals ");
    f.render_widget(Paragraph::new(lines).block(block), centered(area, 40, 7));
}

fn total_line(label: &str, total: u64) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<12}", label), Style::default().fg(Color::Gray)),
        Span::styled(
            total.to_string(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
    ])
}

fn draw_records(f: &mut Frame, app: &App, kind: RecordKind, area: Rect) {
    let show_detail = matches!(app.input_mode, InputMode::Detail);
    let constraints = if show_detail {
        [Constraint::Percentage(55), Constraint::Percentage(45)]
    } else {
        [Constraint::Percentage(100), Constraint::Percentage(0)]
    };
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    match kind {
        RecordKind::Product => {
            let state = app.products.state();
            let rows = state.entities.as_deref().unwrap_or_default();
            let mut title = format!(" Products (page {}", app.page);
            if let Some(p) = state.pagination {
                title.push_str(&format!("/{}, {} total", p.page_count().max(1), p.total));
            }
            title.push(')');
            if !app.product_search.is_empty() {
                title.push_str(&format!(" name~\"{}\"", app.product_search));
            }
            if let Some(category) = app.category_filter_label() {
                title.push_str(&format!(" in {}", category));
            }
            title.push(' ');
            draw_list(f, app, &state, &title, rows.iter().map(product_row).collect(), chunks[0]);
        }
        RecordKind::Category => {
            let state = app.categories.state();
            let rows = state.entities.as_deref().unwrap_or_default();
            draw_list(f, app, &state, " Categories ", rows.iter().map(category_row).collect(), chunks[0]);
        }
        RecordKind::Brand => {
            let state = app.brands.state();
            let rows = state.entities.as_deref().unwrap_or_default();
            draw_list(f, app, &state, " Brands ", rows.iter().map(brand_row).collect(), chunks[0]);
        }
    }

    if show_detail {
        draw_detail(f, app, chunks[1]);
    }
}

fn draw_list<T>(
    f: &mut Frame,
    app: &App,
    state: &RequestState<T>,
    title: &str,
    rows: Vec<String>,
    area: Rect,
) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());

    if rows.is_empty() {
        let text = if state.fetching { "Loading..." } else { "Nothing here yet (n to create)" };
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    // Keep the cursor row on screen
    let visible = area.height.saturating_sub(2) as usize;
    let start = app.cursor.saturating_sub(visible.saturating_sub(1));

    let items: Vec<ListItem> = rows
        .into_iter()
        .enumerate()
        .skip(start)
        .take(visible)
        .map(|(i, row)| {
            let style = if i == app.cursor {
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(row, style)))
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn product_row(p: &Product) -> String {
    format!(
        "{:<28} {:>10.2} {:>6}  {:<14} {}",
        p.name,
        p.price,
        p.quantity,
        p.category.as_ref().map(Related::label).unwrap_or("-"),
        p.brand.as_ref().map(Related::label).unwrap_or("-"),
    )
}

fn category_row(c: &Category) -> String {
    named_row(&c.name, c.num_products)
}

fn brand_row(b: &Brand) -> String {
    named_row(&b.name, b.num_products)
}

fn named_row(name: &str, num_products: Option<u64>) -> String {
    match num_products {
        Some(n) => format!("{:<36} {:>5} products", name, n),
        None => name.to_string(),
    }
}

/// Detail panel for the requested id
fn draw_detail(f: &mut Frame, app: &App, area: Rect) {
    let lines = match app.detail.as_ref().map(|d| &d.view) {
        Some(DetailView::Loading) => vec![Line::from("Loading...")],
        Some(DetailView::Found(DetailRecord::Product(p))) => product_detail(p),
        Some(DetailView::Found(DetailRecord::Category(c))) => category_detail(c),
        Some(DetailView::Found(DetailRecord::Brand(b))) => brand_detail(b),
        Some(DetailView::Failed(msg)) => vec![Line::from(Span::styled(
            msg.clone(),
            Style::default().fg(Color::Red),
        ))],
        Some(DetailView::NotFound) | None => vec![Line::from(Span::styled(
            "not found",
            Style::default().fg(Color::Yellow),
        ))],
    };

    let block = Block::default().borders(Borders::ALL).title(" Detail ");
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn field_line(label: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<12}", label), Style::default().fg(Color::Gray)),
        Span::raw(value.into()),
    ])
}

fn product_detail(p: &Product) -> Vec<Line<'static>> {
    vec![
        field_line("Name", p.name.clone()),
        field_line("Description", p.description.clone().unwrap_or_default()),
        field_line("Price", format!("{:.2}", p.price)),
        field_line("Quantity", p.quantity.to_string()),
        field_line("Category", p.category.as_ref().map(Related::label).unwrap_or("-")),
        field_line("Brand", p.brand.as_ref().map(Related::label).unwrap_or("-")),
        field_line("Id", p.id.clone()),
    ]
}

fn category_detail(c: &Category) -> Vec<Line<'static>> {
    named_detail(&c.id, &c.name, c.description.as_deref(), c.products.as_deref())
}

fn brand_detail(b: &Brand) -> Vec<Line<'static>> {
    named_detail(&b.id, &b.name, b.description.as_deref(), b.products.as_deref())
}

fn named_detail(
    id: &str,
    name: &str,
    description: Option<&str>,
    products: Option<&[Product]>,
) -> Vec<Line<'static>> {
    let mut lines = vec![
        field_line("Name", name),
        field_line("Description", description.unwrap_or_default()),
        field_line("Id", id),
        Line::from(""),
    ];

    match products {
        Some(products) if !products.is_empty() => {
            lines.push(Line::from(Span::styled(
                "Products",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.extend(
                products
                    .iter()
                    .map(|p| Line::from(format!("  {} ({:.2})", p.name, p.price))),
            );
        }
        _ => lines.push(Line::from("No products")),
    }
    lines
}

fn draw_form(f: &mut Frame, title: &str, form: &Form, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let inner = block.inner(area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(form.fields.iter().map(|_| Constraint::Length(3)))
        .split(inner);

    for (i, (field, row)) in form.fields.iter().zip(rows.iter()).enumerate() {
        let focused = i == form.focus;
        let style = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        };
        let input = Paragraph::new(field.display()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(style)
                .title(field.label),
        );
        f.render_widget(input, *row);

        if focused {
            let x = row.x + 1 + field.display().chars().count() as u16;
            f.set_cursor_position((x.min(row.right().saturating_sub(2)), row.y + 1));
        }
    }
}

fn draw_form_popup(f: &mut Frame, title: &str, form: &Form) {
    let area = centered(f.area(), 60, form.fields.len() as u16 * 3 + 2);
    draw_form(f, title, form, area);
}

fn draw_confirm(f: &mut Frame, question: &str) {
    let area = centered(f.area(), question.len() as u16 + 6, 3);
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(question.to_string())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(" Confirm ")),
        area,
    );
}

/// Draw the status bar
fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if let InputMode::Search(text) = &app.input_mode {
        (format!("/{}█", text), Style::default().fg(Color::Yellow))
    } else if let Some((ref msg, level)) = app.status_message {
        let color = match level {
            StatusLevel::Info => Color::Blue,
            StatusLevel::Success => Color::Green,
            StatusLevel::Error => Color::Red,
        };
        (msg.clone(), Style::default().fg(color))
    } else {
        // Default hints based on mode
        let hints = match app.input_mode {
            _ if app.screen == Screen::Auth => "Tab:next field │ Enter:submit │ Ctrl+T:login/register",
            InputMode::Normal if app.screen == Screen::Records(RecordKind::Product) => {
                "j↓ k↑ l:open │ n:new e:edit d:delete │ [/]:page /:search f:category x:clear │ ?:help"
            }
            InputMode::Normal => "tab:screens │ j↓ k↑ l:open │ n:new e:edit d:delete │ ?:help q:quit",
            InputMode::Detail => "Esc:close │ e:edit",
            InputMode::Search(_) => "Enter:search │ Esc:cancel",
            InputMode::Form(_) => "Tab:next field │ ←→:choose │ Enter:save │ Esc:cancel",
            InputMode::Confirm { .. } => "y:yes n:no │ Enter:confirm │ Esc:cancel",
        };
        (hints.to_string(), Style::default().fg(Color::DarkGray))
    };

    f.render_widget(Paragraph::new(text).style(style), area);
}

/// Rectangle of at most `width` x `height` centered in `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
