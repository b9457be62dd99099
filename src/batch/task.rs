//! Linear and pairwise task enumeration.

/// One unit of batch work: an input and its position in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task<I> {
    pub index: usize,
    pub input: I,
}

impl<I> Task<I> {
    pub fn new(index: usize, input: I) -> Self {
        Self { index, input }
    }
}

/// One task per input, `index` = position.
pub fn linear_tasks<I>(inputs: impl IntoIterator<Item = I>) -> Vec<Task<I>> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| Task { index, input })
        .collect()
}

/// An unordered pair of distinct positions, `i < j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pair {
    pub i: usize,
    pub j: usize,
}

/// `n·(n−1)/2`.
pub fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Upper triangle of an `n × n` matrix in row-major order; the diagonal is skipped.
pub fn pairwise_tasks(n: usize) -> Vec<Task<Pair>> {
    let mut tasks = Vec::with_capacity(pair_count(n));
    for i in 0..n {
        for j in (i + 1)..n {
            tasks.push(Task::new(tasks.len(), Pair { i, j }));
        }
    }
    tasks
}

/// Expand upper-triangle results into a symmetric `n × n` matrix.
///
/// `values` must be in [`pairwise_tasks`] order. The diagonal is `O::default()`.
pub(crate) fn mirror_pairs<O>(n: usize, values: Vec<O>) -> Vec<Vec<O>>
where
    O: Clone + Default,
{
    let mut matrix = vec![vec![O::default(); n]; n];
    let pairs = pairwise_tasks(n).into_iter().map(|t| t.input);
    for (Pair { i, j }, v) in pairs.zip(values) {
        matrix[j][i] = v.clone();
        matrix[i][j] = v;
    }
    matrix
}
