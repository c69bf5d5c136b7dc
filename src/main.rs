/// Entry point and frame loop.

mod config;
mod domain;
mod error;
mod logging;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use config::{GreetConfig, MediaConfig};
use sim::event::{Input, StageEvent, Target};
use sim::sequencer::Sequencer;
use ui::input::{InputState, UiAction};
use ui::renderer::{self, Renderer};
use ui::sound::SoundEngine;
use ui::video::VideoPlayer;

fn main() {
    let log_sink = logging::init();
    let config = GreetConfig::load();
    if let Err(e) = log_sink.open(&config.general.log_file) {
        eprintln!("Could not open log file {}: {e}", config.general.log_file.display());
        log_sink.discard();
    }
    log::info!("wishcard starting for {}", config.general.recipient);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let mut sound = match SoundEngine::new(config.media.sfx) {
        Ok(engine) => Some(engine),
        Err(e) => {
            log::warn!("{e}; continuing without audio");
            None
        }
    };
    let mut video = VideoPlayer::new(config.media.video_command.clone());
    let mut seq = Sequencer::new(config);

    let result = frame_loop(&mut seq, &mut renderer, &mut sound, &mut video);

    video.stop();
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        log::error!("frame loop failed: {e}");
        eprintln!("Error: {e}");
    }

    log::info!("wishcard closed at stage {}", seq.stage().title());
    println!();
    println!("{}, {}!", seq.config().general.title, seq.config().general.recipient);
}

fn frame_loop(
    seq: &mut Sequencer,
    renderer: &mut Renderer,
    sound: &mut Option<SoundEngine>,
    video: &mut VideoPlayer,
) -> std::io::Result<()> {
    let mut input = InputState::new();
    let clock = Instant::now();
    let frame = Duration::from_millis(seq.config().general.frame_ms);

    let (cols, rows) = renderer.size();
    let (canvas, page_rows) = renderer::surface(cols, rows);
    seq.handle(0, Input::Resize { canvas, page_rows });

    loop {
        let frame_start = Instant::now();
        let now = clock.elapsed().as_millis() as u64;

        let mut events = Vec::new();
        let actions = input.drain_events().to_vec();
        for action in actions {
            let ev = match action {
                UiAction::Quit => return Ok(()),
                UiAction::Click { col, row } => match renderer.hit(col, row) {
                    Some(target) => Input::Click(target),
                    None => continue,
                },
                UiAction::Start => Input::Click(Target::StartButton),
                UiAction::Scroll(delta) => Input::Scroll(delta),
                UiAction::Page(pages) => Input::Scroll(pages * seq.layout().viewport as i32),
                UiAction::ScrollToEnd(bottom) => Input::ScrollToEnd(bottom),
                UiAction::Resize { cols, rows } => {
                    let (canvas, page_rows) = renderer::surface(cols, rows);
                    Input::Resize { canvas, page_rows }
                }
            };
            events.extend(seq.handle(now, ev));
        }
        events.extend(seq.tick(now));

        process_media_events(sound, video, &seq.config().media, &events);

        renderer.render(seq)?;

        let spent = frame_start.elapsed();
        if spent < frame {
            std::thread::sleep(frame - spent);
        }
    }
}

/// Route stage events to the audio and video transports. Failures are
/// logged and playback stays silent; the greeting carries on either way.
fn process_media_events(
    sound: &mut Option<SoundEngine>,
    video: &mut VideoPlayer,
    media: &MediaConfig,
    events: &[StageEvent],
) {
    for event in events {
        match event {
            StageEvent::StageEntered(stage) => log::info!("entered {}", stage.title()),
            StageEvent::MusicStart => {
                if let Some(sfx) = sound.as_mut() {
                    if let Err(e) = sfx.start_music(&media.intro_track, &media.loop_track) {
                        log::warn!("{e}; music stays silent");
                    }
                }
            }
            StageEvent::VideoStart => {
                if let Some(sfx) = sound.as_ref() {
                    sfx.pause_music();
                }
                if let Err(e) = video.play(&media.video) {
                    log::warn!("{e}; skipping video");
                }
            }
            StageEvent::TextRevealed(k) => log::debug!("journey text {k} revealed"),
            _ => {}
        }

        let Some(sfx) = sound.as_ref() else { continue };
        match event {
            StageEvent::CardRevealed { .. } | StageEvent::PieceSelected(_) => sfx.play_flip(),
            StageEvent::PairMatched { .. } => sfx.play_match(),
            StageEvent::PairMissed { .. } => sfx.play_miss(),
            StageEvent::PiecePlaced => sfx.play_place(),
            StageEvent::CandleBlown { .. } => sfx.play_candle(),
            StageEvent::MemoryWon | StageEvent::PuzzleWon | StageEvent::AllCandlesOut => sfx.play_fanfare(),
            _ => {}
        }
    }
}
