//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx 与键盘事件，将用户输入与快捷键转为 Command
//! 发送给编排器，每帧用 draw 渲染 UiState 与输入缓冲。
//!
//! 导航：Tab 或数字键 1-4 切换工作流；Ctrl+F 在主提交与追问输入之间切换；
//! History 页用 ↑↓ 选择条目、Enter 回放。

use std::collections::HashMap;
use std::io::{self, Stdout};

use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};

use crate::core::{Command, UiState};
use crate::ui::render::{draw, DocGenFill, DocGenState, InputMode};
use crate::workflow::{DocumentPayload, WorkflowKind};

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    state_rx: watch::Receiver<UiState>,
    cmd_tx: mpsc::UnboundedSender<Command>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let event_handler = super::event::EventHandler::new(cmd_tx.clone());
    let mut input_buffer = String::new();
    let mut input_mode = InputMode::Primary;
    let mut result_scroll = 0usize;
    let mut history_selected = 0usize;
    let mut docgen: Option<DocGenState> = None;

    loop {
        let state = state_rx.borrow().clone();
        history_selected = history_selected.min(state.history.len().saturating_sub(1));

        if let Ok(Some(ev)) = event_handler.poll() {
            match ev {
                super::event::AppEvent::Command(cmd) => match cmd {
                    Command::Quit => break,
                    // 取消同时关闭文书生成面板
                    Command::Cancel => docgen = None,
                    _ => {}
                },
                super::event::AppEvent::Key(key) => match key.code {
                    KeyCode::Char('f') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        input_mode = match input_mode {
                            InputMode::Primary => InputMode::FollowUp,
                            InputMode::FollowUp => InputMode::Primary,
                        };
                    }
                    KeyCode::Char('g') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        if docgen.is_some() {
                            docgen = None;
                        } else {
                            event_handler.send(Command::ListTemplates);
                            docgen = Some(DocGenState::default());
                            input_buffer.clear();
                        }
                    }
                    KeyCode::Enter => {
                        let close = if let Some(dg) = docgen.as_mut() {
                            docgen_enter(&event_handler, &state, dg, &mut input_buffer)
                        } else {
                            dispatch_input(
                                &event_handler,
                                &state,
                                input_mode,
                                &mut input_buffer,
                                history_selected,
                            );
                            false
                        };
                        if close {
                            docgen = None;
                        }
                    }
                    KeyCode::Tab => {
                        event_handler.send(Command::SelectWorkflow(state.active.next()));
                        result_scroll = 0;
                    }
                    KeyCode::Char(c @ '1'..='4') if input_buffer.is_empty() && docgen.is_none() => {
                        let idx = c as usize - '1' as usize;
                        event_handler.send(Command::SelectWorkflow(WorkflowKind::ALL[idx]));
                        result_scroll = 0;
                    }
                    KeyCode::Backspace => {
                        input_buffer.pop();
                    }
                    KeyCode::Char(c) => {
                        input_buffer.push(c);
                    }
                    KeyCode::Up => {
                        if let Some(dg) = docgen.as_mut() {
                            if dg.fill.is_none() {
                                dg.selected = dg.selected.saturating_sub(1);
                            }
                        } else if state.active == WorkflowKind::History {
                            history_selected = history_selected.saturating_sub(1);
                        } else {
                            result_scroll = result_scroll.saturating_sub(1);
                        }
                    }
                    KeyCode::Down => {
                        if let Some(dg) = docgen.as_mut() {
                            if dg.fill.is_none() {
                                let count = state.templates.as_ref().map_or(0, Vec::len);
                                dg.selected = (dg.selected + 1).min(count.saturating_sub(1));
                            }
                        } else if state.active == WorkflowKind::History {
                            history_selected = (history_selected + 1)
                                .min(state.history.len().saturating_sub(1));
                        } else {
                            result_scroll = result_scroll.saturating_add(1);
                        }
                    }
                    KeyCode::PageUp => {
                        result_scroll = result_scroll.saturating_sub(10);
                    }
                    KeyCode::PageDown => {
                        result_scroll = result_scroll.saturating_add(10);
                    }
                    KeyCode::Home => {
                        result_scroll = 0;
                    }
                    _ => {}
                },
            }
        }

        let mut scroll_info = (0usize, 0usize);
        terminal.draw(|f| {
            draw(
                f,
                &state,
                &input_buffer,
                input_mode,
                result_scroll,
                history_selected,
                docgen.as_ref(),
                &mut scroll_info,
            );
        })?;
        let (total_lines, viewport_height) = scroll_info;
        result_scroll = result_scroll.min(total_lines.saturating_sub(viewport_height));

        tokio::task::yield_now().await;
    }

    restore_terminal(&mut terminal)?;
    Ok(())
}

/// Enter 分发：按当前工作流与输入模式把缓冲区内容转成 Command
///
/// 文书分析页的输入若是一个存在的 .pdf 路径则按文件上传，否则按粘贴文本提交。
/// 追问模式下目标取当前展示的工作流，合法性由协调器校验。
fn dispatch_input(
    events: &super::event::EventHandler,
    state: &UiState,
    input_mode: InputMode,
    input_buffer: &mut String,
    history_selected: usize,
) {
    if state.active == WorkflowKind::History {
        if !state.history.is_empty() {
            events.send(Command::LoadHistoryEntry(history_selected));
        }
        return;
    }

    let input = input_buffer.trim().to_string();
    if input.is_empty() {
        return;
    }
    input_buffer.clear();

    if input_mode == InputMode::FollowUp {
        events.send(Command::AskFollowUp {
            target: state.active,
            question: input,
        });
        return;
    }

    match state.active {
        WorkflowKind::DocumentAnalysis => {
            let payload = if input.to_lowercase().ends_with(".pdf") {
                match std::fs::read(&input) {
                    Ok(bytes) => {
                        let filename = std::path::Path::new(&input)
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_else(|| input.clone());
                        DocumentPayload::from_file(filename, bytes)
                    }
                    Err(_) => DocumentPayload::from_text(input),
                }
            } else {
                DocumentPayload::from_text(input)
            };
            events.send(Command::AnalyzeDocument(payload));
        }
        WorkflowKind::SimilarCases => {
            events.send(Command::FindSimilarCases(input));
        }
        // FollowUp 页没有主提交：按追问处理，由协调器给出内联提示
        WorkflowKind::FollowUp | WorkflowKind::History => {
            events.send(Command::AskFollowUp {
                target: state.active,
                question: input,
            });
        }
    }
}

/// 文书生成面板的 Enter：选模板 → 逐项填写占位字段 → 发送 GenerateDocument
///
/// 返回 true 表示流程已结束（生成命令已发出），面板应当关闭。
fn docgen_enter(
    events: &super::event::EventHandler,
    state: &UiState,
    dg: &mut DocGenState,
    input_buffer: &mut String,
) -> bool {
    let Some(fill) = dg.fill.as_mut() else {
        // 仍在选模板：目录未就绪或下标越界时不动作
        let Some(templates) = state.templates.as_ref() else {
            return false;
        };
        let Some((id, info)) = templates.get(dg.selected) else {
            return false;
        };
        if info.placeholders.is_empty() {
            events.send(Command::GenerateDocument {
                template: id.clone(),
                fields: HashMap::new(),
            });
            return true;
        }
        dg.fill = Some(DocGenFill {
            template_id: id.clone(),
            title: info.title.clone(),
            placeholders: info.placeholders.clone(),
            values: HashMap::new(),
            index: 0,
        });
        return false;
    };

    let Some(name) = fill.placeholders.get(fill.index).cloned() else {
        return true;
    };
    fill.values.insert(name, input_buffer.trim().to_string());
    input_buffer.clear();
    fill.index += 1;
    if fill.index >= fill.placeholders.len() {
        events.send(Command::GenerateDocument {
            template: fill.template_id.clone(),
            fields: std::mem::take(&mut fill.values),
        });
        return true;
    }
    false
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
