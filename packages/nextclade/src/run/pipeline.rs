use crate::error::AnalysisError;
use crate::io::fasta::{FastaRecord, FastaReader};
use crate::run::context::{AnalysisContext, SequenceAnalysisResult};
use std::collections::BTreeMap;

/// One sequence's outcome, carried from a worker thread to the output stage: either a full
/// [`SequenceAnalysisResult`] or the [`AnalysisError`] that aborted analysis of that one sequence.
pub struct PipelineRecord {
  pub index: usize,
  pub seq_name: String,
  pub outcome: Result<SequenceAnalysisResult, AnalysisError>,
}

/// Runs the three-stage concurrent pipeline: a single reader thread feeds a bounded channel, a pool of
/// `jobs` worker threads drain it and analyze each sequence independently, and a single writer thread
/// reorders completed [`PipelineRecord`]s back into input order before calling `on_record`.
pub fn run_pipeline<R: FastaReader + Send>(mut reader: R, ctx: &AnalysisContext, jobs: usize, mut on_record: impl FnMut(PipelineRecord)) {
  let jobs = jobs.max(1);
  let (fasta_sender, fasta_receiver) = crossbeam_channel::bounded::<FastaRecord>(128);
  let (result_sender, result_receiver) = crossbeam_channel::bounded::<PipelineRecord>(128);

  crossbeam::thread::scope(|scope| {
    scope.spawn(|_| {
      while let Some(record) = reader.next() {
        if fasta_sender.send(record).is_err() {
          break;
        }
      }
      drop(fasta_sender);
    });

    for _ in 0..jobs {
      let fasta_receiver = fasta_receiver.clone();
      let result_sender = result_sender.clone();
      scope.spawn(move |_| {
        for record in &fasta_receiver {
          let outcome = ctx.analyze(&record.seq);
          let pipeline_record = PipelineRecord { index: record.index, seq_name: record.seq_name, outcome };
          if result_sender.send(pipeline_record).is_err() {
            break;
          }
        }
      });
    }
    drop(fasta_receiver);
    drop(result_sender);

    let mut next_expected = 0_usize;
    let mut pending: BTreeMap<usize, PipelineRecord> = BTreeMap::new();
    for record in &result_receiver {
      pending.insert(record.index, record);
      while let Some(&lowest) = pending.keys().next() {
        if lowest != next_expected {
          break;
        }
        let record = pending.remove(&lowest).unwrap();
        on_record(record);
        next_expected += 1;
      }
    }
    // Any records left in `pending` at this point indicate a gap in the input's index sequence (e.g. the
    // reader skipped an index) rather than out-of-order delivery; flush them in index order so no result is
    // silently dropped.
    for (_, record) in pending {
      on_record(record);
    }
  })
  .expect("worker thread panicked");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alphabet::letter::Letter;
  use crate::alphabet::nuc::Nuc;
  use crate::gene::GeneMap;
  use crate::qc::QcConfig;
  use std::collections::VecDeque;

  struct VecReader {
    records: VecDeque<FastaRecord>,
  }

  impl FastaReader for VecReader {
    fn next(&mut self) -> Option<FastaRecord> {
      self.records.pop_front()
    }

    fn is_good(&self) -> bool {
      true
    }
  }

  fn test_ctx() -> AnalysisContext {
    let reference: Vec<Nuc> = "ACGTACGTACGTACGTACGTACGTACGTACGT".chars().map(Nuc::from_char).collect();
    AnalysisContext::new(reference, GeneMap::new(), QcConfig::default(), Default::default(), None)
  }

  #[test]
  fn emits_records_in_input_order_regardless_of_completion_order() {
    let records: VecDeque<FastaRecord> = (0..12)
      .map(|i| FastaRecord { index: i, seq_name: format!("seq{i}"), seq: "ACGTACGTACGTACGTACGTACGTACGTACGT".to_string() })
      .collect();
    let reader = VecReader { records };
    let ctx = test_ctx();

    let mut seen = Vec::new();
    run_pipeline(reader, &ctx, 4, |record| seen.push(record.index));

    assert_eq!(seen, (0..12).collect::<Vec<_>>());
  }

  #[test]
  fn per_sequence_failure_does_not_abort_the_pipeline() {
    let mut records = VecDeque::new();
    records.push_back(FastaRecord { index: 0, seq_name: "ok".to_string(), seq: "ACGTACGTACGTACGTACGTACGTACGTACGT".to_string() });
    records.push_back(FastaRecord { index: 1, seq_name: "too_short".to_string(), seq: "AC".to_string() });
    records.push_back(FastaRecord { index: 2, seq_name: "ok2".to_string(), seq: "ACGTACGTACGTACGTACGTACGTACGTACGT".to_string() });
    let reader = VecReader { records };
    let ctx = test_ctx();

    let mut outcomes = Vec::new();
    run_pipeline(reader, &ctx, 2, |record| outcomes.push((record.index, record.outcome.is_ok())));

    assert_eq!(outcomes, vec![(0, true), (1, false), (2, true)]);
  }
}
