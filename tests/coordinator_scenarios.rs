//! 协调器场景测试
//!
//! 用脚本化的页面代替浏览器，逐条驱动协调器的消息处理，
//! 并通过存储的写入历史检查游标的变化。

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use auto_poster::messaging::{
    ConsoleNotice, CoordinatorMessage, Delivery, DeliveryError, PageLink, StartFailure,
    StartResponse,
};
use auto_poster::models::{Batch, Document, PageContext, Session};
use auto_poster::orchestrator::{Coordinator, OperatorConsole, Phase};
use auto_poster::store::{JsonFileStore, MemoryStore, SessionStore};
use auto_poster::Config;

const BLOG_URL: &str = "https://myblog.tistory.com/manage/newpost";

/// 可编排行为的页面
struct ScriptedPage {
    context: Option<PageContext>,
    /// 接下来有多少次投递会返回 `NoReceiver`
    missing_receiver: Mutex<usize>,
    reinject_result: Result<(), DeliveryError>,
    delivered: Mutex<Vec<usize>>,
    reinjects: Mutex<usize>,
    composers_opened: Mutex<usize>,
}

impl ScriptedPage {
    fn on(url: &str) -> Self {
        Self {
            context: Some(PageContext {
                target_id: "tab-1".to_string(),
                url: url.to_string(),
            }),
            missing_receiver: Mutex::new(0),
            reinject_result: Ok(()),
            delivered: Mutex::new(Vec::new()),
            reinjects: Mutex::new(0),
            composers_opened: Mutex::new(0),
        }
    }

    fn without_tab() -> Self {
        Self {
            context: None,
            ..Self::on(BLOG_URL)
        }
    }

    fn missing_receiver(self, times: usize) -> Self {
        *self.missing_receiver.lock().unwrap() = times;
        self
    }

    fn reinject_fails(mut self) -> Self {
        self.reinject_result = Err(DeliveryError::Script("inject blocked".to_string()));
        self
    }

    fn delivered(&self) -> Vec<usize> {
        self.delivered.lock().unwrap().clone()
    }

    fn reinjects(&self) -> usize {
        *self.reinjects.lock().unwrap()
    }
}

#[async_trait]
impl PageLink for ScriptedPage {
    async fn active_context(&self) -> Result<Option<PageContext>, DeliveryError> {
        Ok(self.context.clone())
    }

    async fn open_composer(&self) -> Result<(), DeliveryError> {
        *self.composers_opened.lock().unwrap() += 1;
        Ok(())
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<(), DeliveryError> {
        let mut missing = self.missing_receiver.lock().unwrap();
        if *missing > 0 {
            *missing -= 1;
            return Err(DeliveryError::NoReceiver);
        }
        self.delivered.lock().unwrap().push(delivery.file_index);
        Ok(())
    }

    async fn reinject(&self) -> Result<(), DeliveryError> {
        *self.reinjects.lock().unwrap() += 1;
        self.reinject_result.clone()
    }
}

fn batch_of(n: usize) -> Batch {
    Batch::new(
        (0..n)
            .map(|i| Document::new(format!("{:02}.html", i), format!("<h1>T{}</h1><p>B{}</p>", i, i)))
            .collect(),
    )
}

struct Harness {
    coordinator: Coordinator,
    store: Arc<MemoryStore>,
    page: Arc<ScriptedPage>,
    notices: mpsc::UnboundedReceiver<ConsoleNotice>,
}

impl Harness {
    fn new(documents: usize, page: ScriptedPage) -> Self {
        let store = Arc::new(MemoryStore::with_batch(batch_of(documents)));
        let page = Arc::new(page);
        let (tx, notices) = mpsc::unbounded_channel();
        let coordinator = Coordinator::new(Config::default(), store.clone(), page.clone(), tx);
        Self {
            coordinator,
            store,
            page,
            notices,
        }
    }

    async fn start(&mut self) -> StartResponse {
        let (reply, response) = oneshot::channel();
        self.coordinator
            .handle(CoordinatorMessage::StartPosting { reply })
            .await;
        response.await.unwrap()
    }

    async fn posted(&mut self, file_index: usize) {
        self.coordinator
            .handle(CoordinatorMessage::FilePosted { file_index })
            .await;
    }

    async fn session(&self) -> Session {
        self.store.load_session().await.unwrap()
    }

    fn running_at(index: usize) -> Session {
        Session::started(Some("tab-1".to_string())).at(index)
    }
}

#[tokio::test]
async fn test_three_documents_posted_in_order() {
    let mut h = Harness::new(3, ScriptedPage::on(BLOG_URL));

    assert_eq!(h.start().await, StartResponse::ok());
    assert_eq!(h.page.delivered(), vec![0]);
    assert_eq!(h.session().await, Harness::running_at(0));
    assert_eq!(h.coordinator.phase(), &Phase::Awaiting(0));

    h.posted(0).await;
    assert_eq!(h.page.delivered(), vec![0, 1]);
    h.posted(1).await;
    assert_eq!(h.page.delivered(), vec![0, 1, 2]);
    assert!(h.notices.try_recv().is_err());

    h.posted(2).await;
    assert_eq!(h.notices.try_recv().unwrap(), ConsoleNotice::PostingDone);
    assert_eq!(h.session().await, Session::idle());
    assert_eq!(h.coordinator.phase(), &Phase::Finished);
    assert_eq!(*h.page.composers_opened.lock().unwrap(), 3);

    // 游标只会前进，且每次投递之前都已写入
    assert_eq!(
        h.store.session_history(),
        vec![
            Harness::running_at(0),
            Harness::running_at(1),
            Harness::running_at(2),
            Session::idle(),
        ]
    );
}

#[tokio::test]
async fn test_start_without_documents_leaves_session_untouched() {
    let mut h = Harness::new(0, ScriptedPage::on(BLOG_URL));

    assert_eq!(h.start().await, StartResponse::failed(StartFailure::NoDocuments));
    assert!(h.page.delivered().is_empty());
    assert!(h.store.session_history().is_empty());
}

#[tokio::test]
async fn test_start_without_tab() {
    let mut h = Harness::new(2, ScriptedPage::without_tab());

    assert_eq!(h.start().await, StartResponse::failed(StartFailure::NoTab));
    assert!(h.store.session_history().is_empty());
}

#[tokio::test]
async fn test_start_on_other_site() {
    let mut h = Harness::new(2, ScriptedPage::on("https://example.com/write"));

    assert_eq!(h.start().await, StartResponse::failed(StartFailure::NotTargetSite));
    assert!(h.page.delivered().is_empty());
    assert!(h.store.session_history().is_empty());
}

#[tokio::test]
async fn test_missing_receiver_recovers_with_one_reinjection() {
    let mut h = Harness::new(2, ScriptedPage::on(BLOG_URL).missing_receiver(1));

    assert_eq!(h.start().await, StartResponse::ok());
    assert_eq!(h.page.reinjects(), 1);
    assert_eq!(h.page.delivered(), vec![0]);
    assert_eq!(h.session().await, Harness::running_at(0));
}

#[tokio::test]
async fn test_missing_receiver_twice_fails_start() {
    let mut h = Harness::new(2, ScriptedPage::on(BLOG_URL).missing_receiver(2));

    assert_eq!(h.start().await, StartResponse::failed(StartFailure::InjectFail));
    assert_eq!(h.page.reinjects(), 1);
    assert!(h.page.delivered().is_empty());
    assert_eq!(h.session().await, Session::idle());
    assert!(matches!(h.coordinator.phase(), Phase::Failed(_)));
    // 启动失败已经通过回执告知，不再额外通知
    assert!(h.notices.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_reinjection_fails_start() {
    let mut h = Harness::new(1, ScriptedPage::on(BLOG_URL).missing_receiver(1).reinject_fails());

    assert_eq!(h.start().await, StartResponse::failed(StartFailure::InjectFail));
    assert_eq!(h.session().await, Session::idle());
}

#[tokio::test]
async fn test_automator_error_aborts_batch() {
    let mut h = Harness::new(3, ScriptedPage::on(BLOG_URL));
    h.start().await;
    h.posted(0).await;

    h.coordinator
        .handle(CoordinatorMessage::Error {
            message: "HTML 按钮不存在".to_string(),
        })
        .await;

    assert_eq!(
        h.notices.try_recv().unwrap(),
        ConsoleNotice::PostingError {
            message: "HTML 按钮不存在".to_string()
        }
    );
    assert_eq!(h.session().await, Session::idle());

    // 中止后的迟到报告不会重新启动批次
    h.posted(1).await;
    assert_eq!(h.page.delivered(), vec![0, 1]);
    assert_eq!(h.session().await, Session::idle());
    assert!(h.notices.try_recv().is_err());
}

#[tokio::test]
async fn test_empty_error_message_becomes_unknown() {
    let mut h = Harness::new(1, ScriptedPage::on(BLOG_URL));
    h.start().await;

    h.coordinator
        .handle(CoordinatorMessage::Error {
            message: "  ".to_string(),
        })
        .await;

    assert_eq!(
        h.notices.try_recv().unwrap(),
        ConsoleNotice::PostingError {
            message: "未知错误".to_string()
        }
    );
}

#[tokio::test]
async fn test_duplicate_report_is_ignored() {
    let mut h = Harness::new(3, ScriptedPage::on(BLOG_URL));
    h.start().await;

    h.posted(0).await;
    h.posted(0).await;

    assert_eq!(h.page.delivered(), vec![0, 1]);
    assert_eq!(h.session().await, Harness::running_at(1));
    assert_eq!(h.store.session_history().len(), 2);
}

#[tokio::test]
async fn test_report_while_idle_is_ignored() {
    let mut h = Harness::new(2, ScriptedPage::on(BLOG_URL));

    h.posted(0).await;

    assert!(h.page.delivered().is_empty());
    assert!(h.store.session_history().is_empty());
    assert!(h.notices.try_recv().is_err());
}

#[tokio::test]
async fn test_late_report_after_completion() {
    let mut h = Harness::new(1, ScriptedPage::on(BLOG_URL));
    h.start().await;
    h.posted(0).await;
    assert_eq!(h.notices.try_recv().unwrap(), ConsoleNotice::PostingDone);

    h.posted(0).await;

    assert_eq!(h.page.delivered(), vec![0]);
    assert!(h.notices.try_recv().is_err());
    assert_eq!(h.session().await, Session::idle());
}

#[tokio::test]
async fn test_delivery_failure_mid_batch_notifies_console() {
    let mut h = Harness::new(3, ScriptedPage::on(BLOG_URL));
    h.start().await;
    *h.page.missing_receiver.lock().unwrap() = 2;

    h.posted(0).await;

    assert!(matches!(
        h.notices.try_recv().unwrap(),
        ConsoleNotice::PostingError { .. }
    ));
    assert_eq!(h.session().await, Session::idle());
    assert_eq!(h.page.delivered(), vec![0]);
}

#[tokio::test]
async fn test_exhausted_running_session_is_normalized() {
    let mut h = Harness::new(2, ScriptedPage::on(BLOG_URL));
    h.store
        .save_session(&Harness::running_at(5))
        .await
        .unwrap();

    h.posted(5).await;

    assert_eq!(h.session().await, Session::idle());
    assert!(h.page.delivered().is_empty());
    assert!(h.notices.try_recv().is_err());
}

#[tokio::test]
async fn test_start_while_running_is_rejected() {
    let mut h = Harness::new(3, ScriptedPage::on(BLOG_URL));
    h.start().await;
    h.posted(0).await;

    assert_eq!(h.start().await, StartResponse::failed(StartFailure::AlreadyRunning));
    assert_eq!(h.page.delivered(), vec![0, 1]);
    assert_eq!(h.session().await, Harness::running_at(1));
    assert_eq!(h.coordinator.phase(), &Phase::Awaiting(1));

    // 正在处理的文档完成后照常推进，不会多投递
    h.posted(1).await;
    assert_eq!(h.page.delivered(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_start_rejected_for_persisted_running_session() {
    let mut h = Harness::new(2, ScriptedPage::on(BLOG_URL));
    h.store
        .save_session(&Harness::running_at(1))
        .await
        .unwrap();

    assert_eq!(h.start().await, StartResponse::failed(StartFailure::AlreadyRunning));
    assert!(h.page.delivered().is_empty());
    assert_eq!(h.session().await, Harness::running_at(1));
}

#[tokio::test]
async fn test_start_after_finished_batch_begins_again() {
    let mut h = Harness::new(1, ScriptedPage::on(BLOG_URL));
    h.start().await;
    h.posted(0).await;
    assert_eq!(h.notices.try_recv().unwrap(), ConsoleNotice::PostingDone);

    assert_eq!(h.start().await, StartResponse::ok());
    assert_eq!(h.page.delivered(), vec![0, 0]);
}

#[tokio::test]
async fn test_new_coordinator_continues_from_persisted_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = Arc::new(JsonFileStore::new(&path));
    store.replace_batch(&batch_of(3)).await.unwrap();

    let first_page = Arc::new(ScriptedPage::on(BLOG_URL));
    let (tx, _notices) = mpsc::unbounded_channel();
    let mut first = Coordinator::new(Config::default(), store.clone(), first_page.clone(), tx);
    let (reply, response) = oneshot::channel();
    first
        .handle(CoordinatorMessage::StartPosting { reply })
        .await;
    assert!(response.await.unwrap().ok);
    first
        .handle(CoordinatorMessage::FilePosted { file_index: 0 })
        .await;
    assert_eq!(first_page.delivered(), vec![0, 1]);
    drop(first);

    // 重新打开存储，模拟协调器被回收后重新启动
    let reopened = Arc::new(JsonFileStore::new(&path));
    let second_page = Arc::new(ScriptedPage::on(BLOG_URL));
    let (tx, mut notices) = mpsc::unbounded_channel();
    let mut second = Coordinator::new(Config::default(), reopened.clone(), second_page.clone(), tx);

    second
        .handle(CoordinatorMessage::FilePosted { file_index: 1 })
        .await;
    assert_eq!(second_page.delivered(), vec![2]);
    assert_eq!(
        reopened.load_session().await.unwrap(),
        Harness::running_at(2)
    );

    second
        .handle(CoordinatorMessage::FilePosted { file_index: 2 })
        .await;
    assert_eq!(notices.try_recv().unwrap(), ConsoleNotice::PostingDone);
    assert_eq!(reopened.load_session().await.unwrap(), Session::idle());
}

#[tokio::test]
async fn test_resume_redelivers_current_document() {
    let mut h = Harness::new(3, ScriptedPage::on(BLOG_URL));
    h.store
        .save_session(&Harness::running_at(1))
        .await
        .unwrap();

    h.coordinator.handle(CoordinatorMessage::Resume).await;

    assert_eq!(h.page.delivered(), vec![1]);
    assert_eq!(h.coordinator.phase(), &Phase::Awaiting(1));

    h.posted(1).await;
    assert_eq!(h.page.delivered(), vec![1, 2]);
}

#[tokio::test]
async fn test_resume_on_exhausted_session_notifies_console() {
    let mut h = Harness::new(1, ScriptedPage::on(BLOG_URL));
    h.store
        .save_session(&Harness::running_at(1))
        .await
        .unwrap();

    h.coordinator.handle(CoordinatorMessage::Resume).await;

    assert_eq!(
        h.notices.try_recv().unwrap(),
        ConsoleNotice::PostingError {
            message: "没有可继续的发布任务".to_string()
        }
    );
    assert!(h.page.delivered().is_empty());
    assert_eq!(h.session().await, Session::idle());
}

#[tokio::test]
async fn test_resume_outcome_reaches_waiting_console() {
    let store = Arc::new(MemoryStore::with_batch(batch_of(2)));
    store.save_session(&Harness::running_at(2)).await.unwrap();
    let (coordinator_tx, coordinator_rx) = mpsc::unbounded_channel();
    let (notice_tx, mut notices) = mpsc::unbounded_channel();
    let coordinator = Coordinator::new(
        Config::default(),
        store.clone(),
        Arc::new(ScriptedPage::on(BLOG_URL)),
        notice_tx,
    );
    tokio::spawn(coordinator.run(coordinator_rx));

    coordinator_tx.send(CoordinatorMessage::Resume).unwrap();
    let status = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        OperatorConsole::wait_for_outcome(&mut notices),
    )
    .await
    .unwrap();

    assert!(status.is_error());
    assert_eq!(store.load_session().await.unwrap(), Session::idle());
}
