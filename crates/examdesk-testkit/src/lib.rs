// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use examdesk_app::{
    AnswerOption, Page, Payment, PaymentId, PaymentStatus, Question, QuestionId, Section,
    SectionId, Test, TestId, TestStatus, Topic, TopicId, User, UserId, UserRole, UserStatus,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration as StdDuration;
use time::{Date, Duration, Month, OffsetDateTime, Time};
use tiny_http::{Header, Response, Server};

const FIRST_NAMES: [&str; 16] = [
    "Amina", "Bola", "Chidi", "Dayo", "Efe", "Funmi", "Gbenga", "Halima", "Ifeoma", "Jide",
    "Kemi", "Lanre", "Musa", "Ngozi", "Ola", "Tunde",
];
const LAST_NAMES: [&str; 14] = [
    "Adeyemi", "Bello", "Chukwu", "Danjuma", "Eze", "Falana", "Garba", "Ibrahim", "Lawal",
    "Nwosu", "Ogunleye", "Okafor", "Usman", "Yusuf",
];
const EMAIL_DOMAINS: [&str; 4] = [
    "mail.example.com",
    "students.example.org",
    "inbox.example.net",
    "school.example.edu",
];

const TEST_TITLES: [&str; 8] = [
    "Mathematics Mock Exam",
    "English Language Practice",
    "Physics Past Questions",
    "Chemistry Drill",
    "Biology Revision",
    "Economics Quiz",
    "Government Review",
    "Literature Sprint",
];
const SECTION_TITLES: [&str; 8] = [
    "Algebra",
    "Geometry",
    "Comprehension",
    "Mechanics",
    "Organic Chemistry",
    "Genetics",
    "Microeconomics",
    "Poetry",
];
const TOPIC_TITLES: [&str; 10] = [
    "Quadratic Equations",
    "Angles",
    "Fractions",
    "Main Idea",
    "Newton's Laws",
    "Hydrocarbons",
    "Inheritance",
    "Supply and Demand",
    "Figures of Speech",
    "Probability",
];
const QUESTION_STEMS: [&str; 6] = [
    "Which of the following best describes",
    "What is the value of",
    "Identify the correct statement about",
    "Choose the option that completes",
    "Which term refers to",
    "Select the most accurate definition of",
];
const OPTION_LABELS: [&str; 4] = ["A", "B", "C", "D"];

const REFERENCE_YEAR: i32 = 2026;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

#[derive(Debug, Clone)]
pub struct ExamFaker {
    rng: DeterministicRng,
    next_id: i64,
}

impl ExamFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 0,
        }
    }

    pub fn user(&mut self) -> User {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let domain = self.pick(&EMAIL_DOMAINS);
        let id = self.id();
        User {
            id: UserId::new(id),
            full_name: format!("{first} {last}"),
            email: format!(
                "{}.{}{id}@{domain}",
                first.to_ascii_lowercase(),
                last.to_ascii_lowercase()
            ),
            phone: Some(format!(
                "+234 80{} {:03} {:04}",
                self.int_range(1, 9),
                self.int_range(100, 999),
                self.int_range(0, 9_999)
            )),
            role: UserRole::Student,
            status: UserStatus::ALL[self.rng.int_n(UserStatus::ALL.len())],
            created_at: Some(self.datetime()),
        }
    }

    pub fn test(&mut self) -> Test {
        Test {
            id: TestId::new(self.id()),
            title: self.pick(&TEST_TITLES).to_owned(),
            description: String::new(),
            price: self.int_range(5, 50) * 100,
            duration_minutes: self.int_range(30, 180) as i32,
            status: TestStatus::ALL[self.rng.int_n(TestStatus::ALL.len())],
        }
    }

    pub fn section(&mut self, test_id: Option<TestId>) -> Section {
        Section {
            id: SectionId::new(self.id()),
            title: self.pick(&SECTION_TITLES).to_owned(),
            description: String::new(),
            test_id,
            status: TestStatus::ALL[self.rng.int_n(TestStatus::ALL.len())],
        }
    }

    pub fn topic(&mut self, section: &Section) -> Topic {
        Topic {
            id: TopicId::new(self.id()),
            title: self.pick(&TOPIC_TITLES).to_owned(),
            section_id: section.id,
            section_title: Some(section.title.clone()),
        }
    }

    pub fn question(&mut self, section_title: &str, topic_title: &str) -> Question {
        let options: Vec<AnswerOption> = OPTION_LABELS
            .iter()
            .map(|label| AnswerOption {
                label: (*label).to_owned(),
                text: format!("Option {label} for {}", topic_title.to_ascii_lowercase()),
            })
            .collect();
        let correct = self.pick(&OPTION_LABELS).to_owned();
        Question {
            id: QuestionId::new(self.id()),
            content: format!(
                "{} {}?",
                self.pick(&QUESTION_STEMS),
                topic_title.to_ascii_lowercase()
            ),
            options,
            correct_option: correct,
            explanation: String::new(),
            section_title: Some(section_title.to_owned()),
            topic_title: Some(topic_title.to_owned()),
            image_url: None,
        }
    }

    pub fn payment(&mut self, user: &User) -> Payment {
        let id = self.id();
        Payment {
            id: PaymentId::new(id),
            user_id: user.id,
            user_email: user.email.clone(),
            test_id: None,
            amount: self.int_range(5, 50) * 100,
            status: PaymentStatus::ALL[self.rng.int_n(PaymentStatus::ALL.len())],
            reference: format!("PAY-{REFERENCE_YEAR}-{id:06}"),
            created_at: Some(self.datetime()),
        }
    }

    pub fn users(&mut self, count: usize) -> Vec<User> {
        (0..count).map(|_| self.user()).collect()
    }

    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }

    fn datetime(&mut self) -> OffsetDateTime {
        let offset = self.int_range(0, 364 * 24 * 60 * 60);
        reference_start() + Duration::seconds(offset)
    }
}

pub fn page_of<T>(data: Vec<T>, current_page: u32, page_size: u32, total_items: u64) -> Page<T> {
    let total_pages = if page_size == 0 {
        0
    } else {
        total_items.div_ceil(u64::from(page_size)) as u32
    };
    Page {
        data,
        current_page,
        page_size,
        total_items,
        total_pages,
    }
}

pub fn json_body<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("serialize fixture")
}

pub fn temp_config_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("config.toml");
    Ok((dir, path))
}

fn reference_start() -> OffsetDateTime {
    let date = Date::from_calendar_date(REFERENCE_YEAR, Month::January, 1).unwrap_or(Date::MIN);
    date.with_time(Time::MIDNIGHT).assume_utc()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl MockResponse {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub body: String,
}

pub struct MockApi {
    base_url: String,
    handle: JoinHandle<()>,
    requests: Receiver<Result<RecordedRequest>>,
}

impl MockApi {
    pub fn serve(responses: Vec<MockResponse>) -> Result<Self> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}/api", server.server_addr());
        let (sender, requests) = mpsc::channel();

        let handle = thread::spawn(move || {
            for canned in responses {
                let request = match server.recv_timeout(StdDuration::from_secs(5)) {
                    Ok(Some(request)) => request,
                    Ok(None) => {
                        let _ = sender.send(Err(anyhow!("mock server timed out waiting")));
                        return;
                    }
                    Err(error) => {
                        let _ = sender.send(Err(anyhow!("mock server receive: {error}")));
                        return;
                    }
                };
                let _ = sender.send(record_and_respond(request, canned));
            }
        });

        Ok(Self {
            base_url,
            handle,
            requests,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn finish(self) -> Result<Vec<RecordedRequest>> {
        self.handle
            .join()
            .map_err(|_| anyhow!("mock server thread panicked"))?;
        self.requests.try_iter().collect()
    }
}

fn record_and_respond(
    mut request: tiny_http::Request,
    canned: MockResponse,
) -> Result<RecordedRequest> {
    let mut body = String::new();
    request
        .as_reader()
        .read_to_string(&mut body)
        .context("read mock request body")?;
    let authorization = request
        .headers()
        .iter()
        .find(|header| header.field.equiv("Authorization"))
        .map(|header| header.value.as_str().to_owned());

    let recorded = RecordedRequest {
        method: request.method().to_string(),
        url: request.url().to_owned(),
        authorization,
        body,
    };

    let content_type = Header::from_bytes("Content-Type", "application/json")
        .map_err(|()| anyhow!("invalid content type header"))?;
    let response = Response::from_string(canned.body)
        .with_status_code(canned.status)
        .with_header(content_type);
    request.respond(response).context("send mock response")?;
    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use super::{ExamFaker, page_of};
    use std::collections::BTreeSet;

    #[test]
    fn same_seed_same_rows() {
        let mut left = ExamFaker::new(42);
        let mut right = ExamFaker::new(42);
        assert_eq!(left.users(5), right.users(5));
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut faker = ExamFaker::new(7);
        let users = faker.users(20);
        let ids: BTreeSet<i64> = users.iter().map(|user| user.id.get()).collect();
        assert_eq!(ids.len(), 20);
        assert_eq!(users[0].id.get(), 1);
    }

    #[test]
    fn payment_links_back_to_user() {
        let mut faker = ExamFaker::new(3);
        let user = faker.user();
        let payment = faker.payment(&user);
        assert_eq!(payment.user_id, user.id);
        assert_eq!(payment.user_email, user.email);
        assert!(payment.amount > 0);
        assert!(payment.reference.starts_with("PAY-2026-"));
    }

    #[test]
    fn question_has_four_options_and_a_valid_answer() {
        let mut faker = ExamFaker::new(9);
        let question = faker.question("Geometry", "Angles");
        assert_eq!(question.options.len(), 4);
        assert!(
            question
                .options
                .iter()
                .any(|option| option.label == question.correct_option)
        );
        assert_eq!(question.topic_title.as_deref(), Some("Angles"));
    }

    #[test]
    fn topic_carries_section_title() {
        let mut faker = ExamFaker::new(11);
        let section = faker.section(None);
        let topic = faker.topic(&section);
        assert_eq!(topic.section_id, section.id);
        assert_eq!(topic.section_title.as_deref(), Some(section.title.as_str()));
    }

    #[test]
    fn page_of_computes_total_pages() {
        let page = page_of(vec![1, 2, 3], 0, 10, 21);
        assert_eq!(page.total_pages, 3);
        let empty = page_of(Vec::<u8>::new(), 0, 0, 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn created_at_falls_in_reference_year() {
        let mut faker = ExamFaker::new(5);
        for user in faker.users(10) {
            let created = user.created_at.expect("generated timestamp");
            assert_eq!(created.year(), 2026);
        }
    }
}
