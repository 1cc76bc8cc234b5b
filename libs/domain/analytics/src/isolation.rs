// [libs/domain/analytics/src/isolation.rs]
/*!
 * =================================================================
 * APARATO: ISOLATION ANOMALY SCORER (V4.2)
 * CLASIFICACIÓN: DOMAIN INFERENCE (ESTRATO L2)
 * RESPONSABILIDAD: ENTRENAMIENTO Y CLASIFICACIÓN POR AISLAMIENTO
 *
 * # Mathematical Proof (Isolation Scoring):
 * Un punto anómalo se aísla con particiones aleatorias en menos cortes
 * que un punto denso. Con E[h(x)] la profundidad media de aislamiento y
 * c(ψ) la profundidad esperada de un árbol binario de búsqueda fallida
 * sobre ψ muestras, el score s(x) = 2^(−E[h(x)]/c(ψ)) tiende a 1 para
 * anomalías y a 0.5 para puntos interiores. El umbral se fija sobre el
 * cuantil (1 − contaminación) de los scores de entrenamiento.
 * =================================================================
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use twinforge_domain_models::telemetry::TelemetrySample;

/// Árboles del bosque.
const TREE_COUNT: usize = 100;

/// Submuestra máxima por árbol.
const SUBSAMPLE_CEILING: usize = 256;

/// Fracción de entrenamiento esperada como atípica.
pub const CONTAMINATION: f64 = 0.05;

/// Constante de Euler–Mascheroni para la profundidad esperada c(n).
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Veredicto del clasificador en línea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyVerdict {
    Normal,
    Anomaly,
}

impl AnomalyVerdict {
    pub fn is_anomaly(self) -> bool {
        matches!(self, AnomalyVerdict::Anomaly)
    }
}

enum IsolationNode {
    Internal {
        feature: usize,
        split: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf {
        size: usize,
    },
}

/// Modelo entrenado por nodo físico; se reemplaza atómicamente al reentrenar.
pub struct IsolationForest {
    trees: Vec<IsolationNode>,
    subsample_size: usize,
    threshold: f64,
}

impl IsolationForest {
    /// Entrena el bosque sobre la matriz de características.
    ///
    /// Determinista para una misma semilla: el muestreo y los cortes salen
    /// de un único `StdRng` sembrado. Retorna `None` con menos de dos filas.
    pub fn fit(matrix: &[Vec<f64>], seed: u64) -> Option<Self> {
        if matrix.len() < 2 {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let subsample_size = matrix.len().min(SUBSAMPLE_CEILING);
        let max_depth = (subsample_size as f64).log2().ceil() as usize;

        let trees = (0..TREE_COUNT)
            .map(|_| {
                let subsample = sample_rows(matrix, subsample_size, &mut rng);
                build_tree(&subsample, 0, max_depth, &mut rng)
            })
            .collect::<Vec<_>>();

        let mut forest = Self { trees, subsample_size, threshold: 0.0 };

        // Cuantil (1 − contaminación) de los scores de entrenamiento.
        let mut training_scores: Vec<f64> =
            matrix.iter().map(|row| forest.score(row)).collect();
        training_scores.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

        let outlier_budget = ((matrix.len() as f64) * CONTAMINATION).floor().max(1.0) as usize;
        forest.threshold = training_scores[outlier_budget.min(training_scores.len() - 1)];

        Some(forest)
    }

    /// Score de anomalía en (0, 1): mayor es más anómalo.
    pub fn score(&self, point: &[f64]) -> f64 {
        let mean_path: f64 = self
            .trees
            .iter()
            .map(|tree| path_length(tree, point, 0))
            .sum::<f64>()
            / self.trees.len() as f64;

        let normalizer = expected_path_length(self.subsample_size);
        if normalizer <= 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_path / normalizer)
    }

    /// Clasificación en línea contra el umbral de contaminación.
    pub fn classify(&self, point: &[f64]) -> AnomalyVerdict {
        if self.score(point) > self.threshold {
            AnomalyVerdict::Anomaly
        } else {
            AnomalyVerdict::Normal
        }
    }
}

/// Vector de características del scorer: (rpm, torque, vib_x, vib_y, vib_z,
/// temperatura, potencia). Los nulos se imputan a cero.
pub fn feature_vector(sample: &TelemetrySample) -> Vec<f64> {
    vec![
        sample.rpm.unwrap_or(0.0),
        sample.torque.unwrap_or(0.0),
        sample.vibration_x.unwrap_or(0.0),
        sample.vibration_y.unwrap_or(0.0),
        sample.vibration_z.unwrap_or(0.0),
        sample.temperature.unwrap_or(0.0),
        sample.power.unwrap_or(0.0),
    ]
}

fn sample_rows(matrix: &[Vec<f64>], amount: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    rand::seq::index::sample(rng, matrix.len(), amount)
        .into_iter()
        .map(|row_index| matrix[row_index].clone())
        .collect()
}

fn build_tree(rows: &[Vec<f64>], depth: usize, max_depth: usize, rng: &mut StdRng) -> IsolationNode {
    if depth >= max_depth || rows.len() <= 1 {
        return IsolationNode::Leaf { size: rows.len() };
    }

    // Solo son particionables las características con rango no degenerado.
    let feature_count = rows[0].len();
    let splittable: Vec<(usize, f64, f64)> = (0..feature_count)
        .filter_map(|feature| {
            let mut minimum = f64::INFINITY;
            let mut maximum = f64::NEG_INFINITY;
            for row in rows {
                minimum = minimum.min(row[feature]);
                maximum = maximum.max(row[feature]);
            }
            (maximum > minimum).then_some((feature, minimum, maximum))
        })
        .collect();

    if splittable.is_empty() {
        return IsolationNode::Leaf { size: rows.len() };
    }

    let (feature, minimum, maximum) = splittable[rng.gen_range(0..splittable.len())];
    let split = rng.gen_range(minimum..maximum);

    let (left_rows, right_rows): (Vec<Vec<f64>>, Vec<Vec<f64>>) =
        rows.iter().cloned().partition(|row| row[feature] < split);

    IsolationNode::Internal {
        feature,
        split,
        left: Box::new(build_tree(&left_rows, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(&right_rows, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &IsolationNode, point: &[f64], depth: usize) -> f64 {
    match node {
        IsolationNode::Leaf { size } => depth as f64 + expected_path_length(*size),
        IsolationNode::Internal { feature, split, left, right } => {
            if point.get(*feature).copied().unwrap_or(0.0) < *split {
                path_length(left, point, depth + 1)
            } else {
                path_length(right, point, depth + 1)
            }
        }
    }
}

/// c(n): profundidad esperada de búsqueda fallida en un BST de n claves.
fn expected_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
