//! 界面渲染
//!
//! 左侧为工作流导航与历史列表，右侧为当前工作流的结果面板（主结果 + 追问区），
//! 底部为输入框；校验/忙碌提示内联在输入框标题，引擎/传输错误以红色横幅展示。

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use std::collections::HashMap;

use crate::core::UiState;
use crate::workflow::WorkflowKind;

/// 输入框当前的提交模式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    /// 主提交（分析 / 检索）
    Primary,
    /// 追问当前工作流的结果
    FollowUp,
}

/// 文书生成面板的本地状态（Ctrl+G 打开：先选模板，再逐项填写占位字段）
#[derive(Default)]
pub struct DocGenState {
    /// 模板列表中的选中下标
    pub selected: usize,
    /// 选定模板后的填写进度；None 表示仍在选模板
    pub fill: Option<DocGenFill>,
}

/// 已选定模板的填写进度
pub struct DocGenFill {
    pub template_id: String,
    pub title: String,
    pub placeholders: Vec<String>,
    pub values: HashMap<String, String>,
    pub index: usize,
}

/// 将内容按宽度换行，支持 UTF-8（按字符数，避免在 UTF-8 中间截断）
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        let mut count = 0usize;
        for ch in para.chars() {
            if count >= width {
                lines.push(std::mem::take(&mut line));
                count = 0;
            }
            line.push(ch);
            count += 1;
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// 绘制一帧；将结果区 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(
    f: &mut Frame,
    state: &UiState,
    input_buffer: &str,
    input_mode: InputMode,
    result_scroll: usize,
    history_selected: usize,
    docgen: Option<&DocGenState>,
    out: &mut (usize, usize),
) {
    let banner_height = if state.banner_error.is_some() || state.notice.is_some() {
        1u16
    } else {
        0
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(banner_height),
            Constraint::Min(5),
            Constraint::Length(4),
        ])
        .split(f.area());

    if let Some(err) = &state.banner_error {
        let banner = Paragraph::new(format!(" {} ", err))
            .style(Style::default().fg(Color::White).bg(Color::Red));
        f.render_widget(banner, rows[0]);
    } else if let Some(notice) = &state.notice {
        let banner = Paragraph::new(format!(" {} ", notice))
            .style(Style::default().fg(Color::Black).bg(Color::Green));
        f.render_widget(banner, rows[0]);
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(30)])
        .split(rows[1]);

    draw_sidebar(f, state, history_selected, columns[0]);
    if let Some(dg) = docgen {
        draw_docgen_panel(f, state, dg, columns[1]);
        *out = (0, 0);
    } else {
        draw_result_panel(f, state, result_scroll, columns[1], out);
    }
    draw_input(f, state, input_buffer, input_mode, docgen, rows[2]);
}

/// 文书生成面板：模板列表或占位字段填写进度
fn draw_docgen_panel(f: &mut Frame, state: &UiState, dg: &DocGenState, area: Rect) {
    let block = Block::default()
        .title(" 文书生成 ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    if let Some(fill) = &dg.fill {
        let mut lines: Vec<Line> = vec![
            Line::from(Span::styled(
                fill.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::raw("")),
        ];
        for (i, name) in fill.placeholders.iter().enumerate() {
            let marker = if i == fill.index { "▶ " } else { "  " };
            let value = fill.values.get(name).map(String::as_str).unwrap_or("");
            let style = if i == fill.index {
                Style::default().fg(Color::Yellow)
            } else if i < fill.index {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            lines.push(Line::from(Span::styled(
                format!("{}{}: {}", marker, name, value),
                style,
            )));
        }
        let paragraph = Paragraph::new(Text::from(lines)).block(block).wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
        return;
    }

    match &state.templates {
        Some(templates) if !templates.is_empty() => {
            let items: Vec<ListItem> = templates
                .iter()
                .map(|(_, info)| {
                    ListItem::new(Text::from(vec![
                        Line::from(Span::styled(
                            info.title.clone(),
                            Style::default().add_modifier(Modifier::BOLD),
                        )),
                        Line::from(Span::styled(
                            format!("  {}", info.description),
                            Style::default().fg(Color::DarkGray),
                        )),
                    ]))
                })
                .collect();
            let mut list_state = ListState::default();
            list_state.select(Some(dg.selected.min(templates.len() - 1)));
            let list = List::new(items)
                .block(block)
                .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
            f.render_stateful_widget(list, area, &mut list_state);
        }
        Some(_) => {
            let paragraph = Paragraph::new("No templates available.").block(block);
            f.render_widget(paragraph, area);
        }
        None => {
            let paragraph = Paragraph::new("正在拉取模板目录…").block(block);
            f.render_widget(paragraph, area);
        }
    }
}

/// 左侧：工作流导航（带忙碌指示）+ 历史列表
fn draw_sidebar(f: &mut Frame, state: &UiState, history_selected: usize, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(3)])
        .split(area);

    let nav_items: Vec<ListItem> = WorkflowKind::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let marker = if state.busy.get(*kind) { "…" } else { " " };
            let label = format!("{} {} {}", i + 1, kind.title(), marker);
            let style = if *kind == state.active {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Span::styled(label, style))
        })
        .collect();
    let nav = List::new(nav_items).block(
        Block::default()
            .title(" LegalMitra ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    f.render_widget(nav, halves[0]);

    let history_items: Vec<ListItem> = state
        .history
        .iter()
        .map(|entry| {
            let label = format!("[{}] {}", entry.kind.workflow().title(), entry.preview());
            ListItem::new(Span::raw(
                label.chars().take(area.width.saturating_sub(2) as usize).collect::<String>(),
            ))
        })
        .collect();
    let mut list_state = ListState::default();
    if !state.history.is_empty() {
        list_state.select(Some(history_selected));
    }
    let history = List::new(history_items)
        .block(Block::default().title(" History ").borders(Borders::ALL))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    f.render_stateful_widget(history, halves[1], &mut list_state);
}

/// 右侧：当前工作流的主结果与追问结果
fn draw_result_panel(
    f: &mut Frame,
    state: &UiState,
    result_scroll: usize,
    area: Rect,
    out: &mut (usize, usize),
) {
    let slot = state.store.read(state.active);
    let content_width = area.width.saturating_sub(2) as usize;

    let mut text_lines: Vec<Line> = Vec::new();
    if slot.primary.is_empty() {
        text_lines.push(Line::from(Span::styled(
            "No result yet. Type below and press Enter to submit.",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        for line in wrap_text(&slot.primary, content_width.max(40)) {
            text_lines.push(Line::from(Span::raw(line)));
        }
    }
    if !slot.follow_up.is_empty() {
        text_lines.push(Line::from(Span::raw("")));
        text_lines.push(Line::from(Span::styled(
            "Follow-up",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        for line in wrap_text(&slot.follow_up, content_width.max(40)) {
            text_lines.push(Line::from(Span::raw(line)));
        }
    }

    let title = if state.busy.get(state.active) {
        format!(" {} │ 处理中… ", state.active.title())
    } else {
        format!(" {} ", state.active.title())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let content_height = area.height.saturating_sub(2) as usize;
    let total_lines = text_lines.len();
    let scroll_offset = result_scroll.min(total_lines.saturating_sub(content_height));

    let paragraph = Paragraph::new(Text::from(text_lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll_offset as u16, 0));
    f.render_widget(paragraph, area);

    out.0 = total_lines;
    out.1 = content_height;
}

/// 底部输入框：标题展示模式与内联提示，快捷键提示贴在下边框
fn draw_input(
    f: &mut Frame,
    state: &UiState,
    input_buffer: &str,
    input_mode: InputMode,
    docgen: Option<&DocGenState>,
    area: Rect,
) {
    let title = if let Some(notice) = &state.inline_notice {
        format!(" {} ", notice.chars().take(60).collect::<String>())
    } else if let Some(dg) = docgen {
        match &dg.fill {
            Some(fill) => format!(
                " 填写 {} ({}/{}) ",
                fill.placeholders.get(fill.index).map(String::as_str).unwrap_or(""),
                fill.index + 1,
                fill.placeholders.len()
            ),
            None => " ↑↓ 选择模板，Enter 确认，Ctrl+G 关闭 ".to_string(),
        }
    } else {
        match (input_mode, state.active) {
            (InputMode::FollowUp, _) => format!(" 追问 {} ", state.active.title()),
            (InputMode::Primary, WorkflowKind::DocumentAnalysis) => {
                " 输入文本或 PDF 路径 ".to_string()
            }
            (InputMode::Primary, WorkflowKind::SimilarCases) => " 描述法律情形 ".to_string(),
            (InputMode::Primary, WorkflowKind::History) => " Enter 回放选中条目 ".to_string(),
            (InputMode::Primary, _) => " 输入 ".to_string(),
        }
    };

    let border_color = if state.inline_notice.is_some() {
        Color::Red
    } else if input_mode == InputMode::FollowUp {
        Color::Cyan
    } else {
        Color::Blue
    };

    let hint = " Enter 提交 │ Tab/1-4 切换 │ Ctrl+F 追问 │ Ctrl+G 文书 │ Ctrl+R 刷新历史 │ Ctrl+C 取消 │ Ctrl+Q 退出 ";
    let input_block = Block::default()
        .title(title)
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let input = Paragraph::new(input_buffer)
        .block(input_block)
        .wrap(Wrap { trim: false });
    f.render_widget(input, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_splits_at_width() {
        let lines = wrap_text("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_text_keeps_paragraphs() {
        let lines = wrap_text("第一段落很长需要换行\n短", 5);
        assert_eq!(lines, vec!["第一段落很", "长需要换行", "短"]);
    }

    #[test]
    fn test_wrap_text_empty_and_zero_width() {
        assert_eq!(wrap_text("", 10), vec![String::new()]);
        assert_eq!(wrap_text("anything", 0), vec!["anything".to_string()]);
    }
}
