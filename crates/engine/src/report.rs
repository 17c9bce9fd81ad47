//! Plain-text rendering of inventory, board and inbox views.

use crate::notify::Inbox;
use crate::query::ItemView;
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use zerospoil_core::{BoardPost, Status};

const RULE: char = '═';

fn dmy(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".into())
}

fn kg(qty: Decimal) -> String {
    format!("{qty:.2}")
}

/// Column-aligned table framed like the other reports.
fn table(title: &str, headers: &[&str], rows: &[Vec<String>], empty: &str) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let inner = widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1);
    let inner = inner.max(title.chars().count()).max(empty.chars().count());
    let bar: String = std::iter::repeat(RULE).take(inner + 2).collect();

    let line = |cells: &[String]| -> String {
        let joined = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}", w = *w))
            .collect::<Vec<_>>()
            .join(" │ ");
        format!("║ {joined:<inner$} ║\n")
    };

    let mut out = String::new();
    out.push_str(&format!("╔{bar}╗\n"));
    out.push_str(&format!("║ {title:^inner$} ║\n"));
    out.push_str(&format!("╠{bar}╣\n"));
    if rows.is_empty() {
        out.push_str(&format!("║ {empty:<inner$} ║\n"));
    } else {
        let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        out.push_str(&line(&header[..]));
        out.push_str(&format!("╟{}╢\n", "─".repeat(inner + 2)));
        for row in rows {
            out.push_str(&line(&row[..]));
        }
    }
    out.push_str(&format!("╚{bar}╝\n"));
    out
}

pub fn render_inventory(username: &str, views: &[ItemView<'_>]) -> String {
    let rows: Vec<Vec<String>> = views
        .iter()
        .map(|v| {
            let status = match (v.status, v.days_left) {
                (Status::Redistributing, _) | (_, None) => v.status.to_string(),
                (s, Some(d)) => format!("{s} ({d}d left)"),
            };
            vec![
                v.item.id.to_string(),
                v.item.store_id.clone(),
                v.item.store_name.clone(),
                v.item.product.clone(),
                kg(v.item.qty),
                dmy(v.item.expiry_date),
                status,
                v.item.category.clone(),
            ]
        })
        .collect();
    table(
        &format!("INVENTORY - {username}"),
        &["Id", "Store ID", "Store", "Product", "Qty (kg)", "Expiry", "Status", "Category"],
        &rows,
        "No items yet.",
    )
}

/// Open posts only; the viewer's own posts are marked instead of claimable.
pub fn render_board(viewer: &str, posts: &[&BoardPost]) -> String {
    let rows: Vec<Vec<String>> = posts
        .iter()
        .map(|p| {
            vec![
                p.post_id.to_string(),
                if p.owner == viewer {
                    format!("{} (your post)", p.owner)
                } else {
                    p.owner.clone()
                },
                format!("{} ({})", p.store_name, p.store_id),
                p.product.clone(),
                dmy(p.expiry_date),
                p.category.clone(),
                kg(p.qty_total),
                kg(p.qty_remaining),
            ]
        })
        .collect();
    table(
        "REDISTRIBUTION BOARD",
        &["Post", "Owner", "Store", "Product", "Expiry", "Category", "Qty Total", "Qty Left"],
        &rows,
        "Nothing on the board right now.",
    )
}

pub fn render_inbox(inbox: &Inbox) -> String {
    let rows: Vec<Vec<String>> = inbox
        .recent()
        .iter()
        .map(|n| {
            vec![
                if n.read { " " } else { "•" }.to_string(),
                n.message.clone(),
                n.created_at
                    .with_timezone(&Local)
                    .format("%d/%m/%Y %H:%M")
                    .to_string(),
            ]
        })
        .collect();
    table(
        &format!("NOTIFICATIONS ({} unread)", inbox.unread_count()),
        &["", "Message", "When"],
        &rows,
        "No notifications.",
    )
}
