// ==========================================
// 行情数据导入系统 - 分批加载器
// ==========================================
// 职责: 记录流 → 映射 → 分批写入（每批一次插入 + 一次提交）
// 状态: 累积 →(批满) 写入 → 累积；流结束 → 写入末批 → 完成
// 红线:
// - 建表在任何行之前执行且仅执行一次
// - 写入/提交失败立即中断，不重试，已提交批次保留
// - 只有满批写入后才报告进度，末批不报告
// ==========================================

use crate::domain::price_bar::{LoadSummary, PriceBar};
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::FieldMapper;
use crate::importer::raw_record::RawRecord;
use crate::repository::price_bar_repo::PriceBarRepository;
use tracing::{debug, info};

/// 进度回调: 参数为累计已写入行数
pub type ProgressFn<'a> = Box<dyn FnMut(usize) + 'a>;

pub struct BatchedLoader<'a, S: PriceBarRepository + ?Sized> {
    repo: &'a mut S,
    mapper: FieldMapper,
    batch_size: usize,
    progress: Option<ProgressFn<'a>>,
}

impl<'a, S: PriceBarRepository + ?Sized> BatchedLoader<'a, S> {
    /// # 参数
    /// - repo: 独占的写入端
    /// - batch_size: 每批行数（< 1 时按 1 处理）
    pub fn new(repo: &'a mut S, batch_size: usize) -> Self {
        Self {
            repo,
            mapper: FieldMapper::new(),
            batch_size: batch_size.max(1),
            progress: None,
        }
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(usize) + 'a,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 消费记录流并分批落库
    ///
    /// # 返回
    /// - Ok(LoadSummary): 写入行数、丢弃行数、批次数
    /// - Err: 读取失败、小数损坏、写入或提交失败（之前的批次已提交）
    pub fn load<I, R>(&mut self, records: I) -> ImportResult<LoadSummary>
    where
        I: IntoIterator<Item = ImportResult<R>>,
        R: RawRecord,
    {
        self.repo.ensure_table()?;

        let mut summary = LoadSummary::default();
        let mut batch: Vec<PriceBar> = Vec::with_capacity(self.batch_size);

        for record in records {
            let record = record?;
            match self.mapper.map_to_price_bar(&record)? {
                Some(bar) => batch.push(bar),
                None => {
                    summary.rejected += 1;
                    debug!(row = record.row_number(), "日期缺失或无效，丢弃该行");
                }
            }

            if batch.len() >= self.batch_size {
                self.flush(&mut batch, &mut summary)?;
                info!(
                    accepted = summary.accepted,
                    batch_size = self.batch_size,
                    "已导入 {} 行",
                    summary.accepted
                );
                if let Some(progress) = self.progress.as_mut() {
                    progress(summary.accepted);
                }
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch, &mut summary)?;
        }

        Ok(summary)
    }

    fn flush(&mut self, batch: &mut Vec<PriceBar>, summary: &mut LoadSummary) -> ImportResult<()> {
        let inserted = self.repo.insert_batch(batch)?;
        summary.accepted += inserted;
        summary.batches += 1;
        debug!(rows = inserted, batches = summary.batches, "批次已提交");
        batch.clear();
        Ok(())
    }
}
