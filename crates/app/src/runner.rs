//! Terminal front end for a single practice, review or exam run.

use std::error::Error;

use exam_core::QuestionBank;
use exam_core::model::{ExamResult, OptionId, QuestionKind};
use services::{
    BeginOutcome, ExplanationView, PracticeSession, QuestionView, SessionController, SessionError,
    SessionKind, SessionRules, SessionScope, TimeDisplay, WrongQuestionTracker,
};
use tokio::io::{AsyncBufReadExt, BufReader};

enum Step {
    Continue,
    Finished(ExamResult),
    Quit,
}

/// Drive one run: ticks and stdin lines are multiplexed until the run is
/// submitted, times out, or the learner quits.
pub async fn run_session(
    controller: &mut SessionController,
    scope: SessionScope,
) -> Result<(), Box<dyn Error>> {
    let mut session = controller.new_session();
    controller.choose(&mut session, scope)?;
    if let Some(rules) = session.rules() {
        print_rules(&rules);
    }

    let mut ticks = match controller.begin(&mut session).await {
        Ok(BeginOutcome::Started { ticks }) => ticks,
        Ok(BeginOutcome::ForceSubmitted(result)) => {
            println!("Timer unavailable; the session was submitted as is.");
            print_result(&result);
            return Ok(());
        }
        Err(SessionError::Empty) => {
            println!("No questions match this selection.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    print_help();
    render_current(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(()) = ticks.recv() => {
                if let Some(result) = controller.tick(&mut session).await? {
                    println!();
                    println!("Time is up.");
                    print_result(&result);
                    return Ok(());
                }
                announce_time(session.time_display());
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    controller.abandon(&mut session)?;
                    println!("Input closed; session abandoned.");
                    return Ok(());
                };
                match handle_line(controller, &mut session, line.trim()).await {
                    Ok(Step::Continue) => {}
                    Ok(Step::Finished(result)) => {
                        print_result(&result);
                        return Ok(());
                    }
                    Ok(Step::Quit) => {
                        controller.abandon(&mut session)?;
                        println!("Session abandoned.");
                        return Ok(());
                    }
                    Err(SessionError::Tracker(err)) => return Err(err.into()),
                    Err(err) => println!("! {err}"),
                }
            }
        }
    }
}

async fn handle_line(
    controller: &mut SessionController,
    session: &mut PracticeSession,
    line: &str,
) -> Result<Step, SessionError> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next().unwrap_or("n");
    let arg = parts.next();

    match (cmd, arg) {
        ("n", _) => {
            session.next()?;
            render_current(session);
        }
        ("p", _) => {
            session.previous()?;
            render_current(session);
        }
        ("g", Some(raw)) => {
            let Ok(position) = raw.parse::<usize>() else {
                println!("! not a question number: {raw}");
                return Ok(Step::Continue);
            };
            session.go_to(position.saturating_sub(1))?;
            render_current(session);
        }
        ("a", Some(raw)) => {
            let Ok(option) = OptionId::new(raw) else {
                println!("! not an option id: {raw}");
                return Ok(Step::Continue);
            };
            let Some(question_id) = session.current_question().map(|q| q.id()) else {
                return Ok(Step::Continue);
            };
            session.select_answer(question_id, option)?;
            render_current(session);
        }
        ("sheet", _) => print_sheet(session),
        ("t", _) => println!("{}", describe_time(session.time_display())),
        ("s", _) => {
            let request = session.request_submit()?;
            println!(
                "Submit {} of {} answered ({} unanswered)? [y] confirm, [c] cancel",
                request.answered, request.total, request.unanswered
            );
        }
        ("y", _) => {
            let result = controller.confirm_submit(session).await?;
            return Ok(Step::Finished(result));
        }
        ("c", _) => {
            session.cancel_submit();
            render_current(session);
        }
        ("q", _) => return Ok(Step::Quit),
        _ => print_help(),
    }
    Ok(Step::Continue)
}

fn print_help() {
    println!("Commands: a <option> select | n next | p previous | g <n> go to");
    println!("          sheet answer sheet | t time | s submit | y/c confirm/cancel | q quit");
}

fn print_rules(rules: &SessionRules) {
    let kind = match rules.kind {
        SessionKind::Exam => "Exam",
        SessionKind::Practice => "Practice",
        SessionKind::Review => "Review",
    };
    println!("== {kind}: {} ==", rules.title);
    if rules.duration_seconds > 0 {
        println!("Time limit: {}", TimeDisplay::Remaining(rules.duration_seconds));
    } else {
        println!("Untimed");
    }
    if let Some(limit) = rules.question_limit {
        println!("Up to {limit} questions");
    }
    println!("Passing score: {}%", rules.passing_score);
}

fn render_current(session: &PracticeSession) {
    if let Some(view) = session.current_view() {
        render_question(&view, session.time_display());
    }
}

fn render_question(view: &QuestionView, time: TimeDisplay) {
    let kind = match view.kind {
        QuestionKind::Single => "single choice",
        QuestionKind::Multiple => "multiple choice",
    };
    println!();
    println!(
        "[{}/{}] ({kind}) {}",
        view.index + 1,
        view.total,
        describe_time(time)
    );
    println!("{}", view.content);
    if let Some(image) = &view.image {
        println!("  image: {}", image.to_raw());
    }
    for option in &view.options {
        let mark = if option.selected { "x" } else { " " };
        println!("  [{mark}] {}. {}", option.id, option.text);
    }
}

fn describe_time(time: TimeDisplay) -> String {
    if time.is_countdown() {
        format!("{time} left")
    } else {
        format!("{time} elapsed")
    }
}

fn announce_time(time: TimeDisplay) {
    if let TimeDisplay::Remaining(seconds) = time {
        if seconds > 0 && (seconds % 60 == 0 || seconds <= 10) {
            println!("  ... {}", describe_time(time));
        }
    }
}

fn print_sheet(session: &PracticeSession) {
    let cells: Vec<String> = session
        .answer_sheet()
        .iter()
        .map(|item| {
            let mark = if item.is_current {
                '>'
            } else if item.answered {
                '*'
            } else {
                '.'
            };
            format!("{}{mark}", item.index + 1)
        })
        .collect();
    println!("{}", cells.join(" "));
    let progress = session.progress();
    println!("{}/{} answered", progress.answered, progress.total);
}

fn print_result(result: &ExamResult) {
    println!();
    println!(
        "Score: {}% ({}) - pass mark {}%",
        result.overall_percentage,
        if result.passed { "passed" } else { "failed" },
        result.passing_score
    );
    println!(
        "{} of {} correct, {} answered, {} used",
        result.correct_count(),
        result.total_questions(),
        result.answered_count,
        TimeDisplay::Elapsed(result.time_used_seconds)
    );
    for subject in &result.subject_scores {
        println!(
            "  {:<20} {:>3}% ({}/{})",
            subject.subject, subject.percentage, subject.correct_count, subject.question_count
        );
    }
    if !result.wrong_questions.is_empty() {
        let ids: Vec<String> = result.wrong_questions.iter().map(ToString::to_string).collect();
        println!("Added to wrong questions: {}", ids.join(", "));
    }
}

pub fn print_profiles(bank: &QuestionBank) {
    println!("{} questions in bank", bank.len());
    for profile in bank.profiles() {
        let time = if profile.is_timed() {
            TimeDisplay::Remaining(profile.duration_seconds()).to_string()
        } else {
            "untimed".to_string()
        };
        println!(
            "  #{} {} - {} questions, {time}, pass {}%",
            profile.id(),
            profile.name(),
            profile.total_questions(),
            profile.passing_score()
        );
    }
}

pub fn print_wrong_questions(tracker: &WrongQuestionTracker) {
    let stats = tracker.stats();
    println!(
        "{} tracked: {} new, {} reviewed, {} mastered",
        stats.total(),
        stats.new,
        stats.reviewed,
        stats.mastered
    );
    for record in tracker.records() {
        println!(
            "  #{:<5} {:<9} missed {}x, reviewed {}x, last missed {}",
            record.question_id().value(),
            record.status().as_str(),
            record.wrong_count(),
            record.review_count(),
            record.wrong_date().format("%Y-%m-%d %H:%M")
        );
    }
}

pub fn print_explanation(view: &ExplanationView) {
    match &view.explanation {
        Some(text) => println!("{text}"),
        None => println!("No explanation for question {}.", view.question_id),
    }
    if let Some(record) = &view.record {
        println!("(status: {}, reviewed {}x)", record.status(), record.review_count());
    }
}
